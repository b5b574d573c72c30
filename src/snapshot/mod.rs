mod maps;
mod pagemap;
mod pfn;

use std::path::Path;

use log::debug;

use crate::flags::FRAME_FLAG_MASK;
use crate::PAGE_SIZE;

/// One virtually-contiguous mapping of a process, with per-page physical
/// attributes attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRegion {
    pub start: u64,
    pub end: u64,
    /// Path backing the mapping; empty for anonymous memory.
    pub backing_file: String,
    /// System-wide use count of the frame backing each page, zero for pages
    /// that are not present.
    pub use_counts: Vec<u32>,
    /// Composite flag word per page, see [`crate::flags::PageFlags`].
    pub combined_flags: Vec<u32>,
}

impl MappedRegion {
    pub fn page_count(&self) -> usize {
        ((self.end - self.start) / PAGE_SIZE) as usize
    }
}

/// Point-in-time page-level view of one process's address space.
///
/// Regions are sorted by start address and never overlap. An empty region
/// list means the pagemap could not be read, which in practice means the
/// caller lacks privileges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub regions: Vec<MappedRegion>,
}

impl Snapshot {
    pub fn capture(pid: u32) -> Snapshot {
        Self::capture_at(Path::new("/proc"), pid)
    }

    /// Capture against an arbitrary proc-shaped directory: `<root>/<pid>/maps`,
    /// `<root>/<pid>/pagemap`, `<root>/kpagecount`, `<root>/kpageflags`.
    pub fn capture_at(root: &Path, pid: u32) -> Snapshot {
        let mut regions = maps::read_mapped_regions(root, pid);
        let scan = pagemap::scan(root, pid, &mut regions);
        if scan.pfns.is_empty() {
            // usual cause: pagemap unreadable without privileges
            debug!("no present pages seen for pid {}", pid);
            return Snapshot::default();
        }

        let (ranges, total_words) = pfn::plan_ranges(scan.pfns);
        let attrs = pfn::PfnAttrs::read(root, ranges, total_words);

        for (region, entries) in regions.iter_mut().zip(&scan.entries) {
            for (i, &entry) in entries.iter().enumerate() {
                if let Some(pfn) = pagemap::pfn_of(entry) {
                    region.use_counts[i] = attrs.use_count(pfn) as u32;
                    region.combined_flags[i] |= attrs.flags(pfn) as u32 & FRAME_FLAG_MASK;
                }
            }
        }
        regions.sort_by_key(|r| r.start);
        correct_overlaps(&mut regions);
        Snapshot { regions }
    }
}

/// The kernel sometimes reports overlapping mappings while the watched
/// process is mutating its address space. Assign any overlapped area to the
/// region that claimed it first, trimming the later region's start and the
/// matching prefix of its per-page arrays. A fully shadowed region collapses
/// to an empty one at its corrected start, which keeps the list sorted and
/// restores `regions[k].start >= regions[k - 1].end`.
fn correct_overlaps(regions: &mut [MappedRegion]) {
    for i in 1..regions.len() {
        let prev_end = regions[i - 1].end;
        if regions[i].start >= prev_end {
            continue;
        }
        let region = &mut regions[i];
        debug!(
            "correcting overlap: {:x}..{:x} vs previous end {:x}",
            region.start, region.end, prev_end
        );
        let saved_start = region.start;
        region.start = prev_end;
        if region.start >= region.end {
            region.end = region.start;
            region.use_counts.clear();
            region.combined_flags.clear();
        } else if !region.use_counts.is_empty() {
            let trimmed = ((region.start - saved_start) / PAGE_SIZE) as usize;
            region.use_counts.drain(..trimmed);
            region.combined_flags.drain(..trimmed);
        }
        debug!("corrected to {:x}..{:x}", regions[i].start, regions[i].end);
    }
}
