use std::fmt;

use crate::flags::PageFlags;
use crate::snapshot::Snapshot;
use crate::PAGE_SIZE;

/// Aggregate memory figures for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Total mapped virtual address space, bytes.
    pub virtual_size: u64,
    /// Bytes of the address space backed by resident frames.
    pub resident: u64,
    /// Resident bytes with every shared page divided by its use count: the
    /// process's fair share of shared memory.
    pub proportional: u64,
    /// Pages whose frame reports a use count of zero.
    pub zero_use_count_pages: u64,
}

impl Summary {
    pub fn compute(snapshot: &Snapshot) -> Summary {
        let mut virtual_size = 0;
        let mut private = 0;
        let mut shared_full = 0;
        let mut shared_prop = 0;
        let mut zero_use_count_pages = 0;

        for region in &snapshot.regions {
            virtual_size += region.end - region.start;
            for (i, &use_count) in region.use_counts.iter().enumerate() {
                let flags = PageFlags::from_bits_retain(region.combined_flags[i]);
                // the kernel reports use count 0 for transparent hugepage
                // tail pages; treat them like the head page
                if use_count == 1 || flags.contains(PageFlags::THP) {
                    private += PAGE_SIZE;
                } else if use_count == 0 {
                    zero_use_count_pages += 1;
                } else {
                    shared_full += PAGE_SIZE;
                    shared_prop += PAGE_SIZE / use_count as u64;
                }
            }
        }

        Summary {
            virtual_size,
            resident: private + shared_full,
            proportional: private + shared_prop,
            zero_use_count_pages,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VSZ is {}MiB", self.virtual_size / 1024 / 1024)?;
        writeln!(f, "RSS is {}MiB", self.resident / 1024 / 1024)?;
        writeln!(f, "PSS is {}MiB", self.proportional / 1024 / 1024)?;
        writeln!(
            f,
            "number of pages with zero use count is {}",
            self.zero_use_count_pages
        )
    }
}
