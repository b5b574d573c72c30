use std::cell::Cell;
use std::fs::File;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use nix::sys::uio::pread;

/// Largest hole between consecutive PFNs that is still cheaper to read
/// through than to split into another syscall. Determined empirically; the
/// kernel has to generate output even for frames nobody asked about, so
/// reading huge gaps costs more than it saves.
pub(crate) const MAX_GAP_SIZE: u64 = 16;

const WORD_BYTES: usize = 8;

/// Closed interval of PFNs covered by one positioned read per attribute
/// file, with its two slots in the shared flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PfnRange {
    pub start: u64,
    pub last: u64,
    pub use_counts_offset: usize,
    pub flags_offset: usize,
}

impl PfnRange {
    fn word_count(&self) -> usize {
        (self.last - self.start + 1) as usize
    }

    fn contains(&self, pfn: u64) -> bool {
        pfn >= self.start && pfn <= self.last
    }
}

/// Sort and deduplicate the observed PFNs, coalesce runs whose gaps stay
/// within [`MAX_GAP_SIZE`], then lay all ranges out in one flat storage plan
/// (use counts first, then flags, per range). Returns the ranges and the
/// total plan size in 64-bit words. Planning everything into a single
/// allocation instead of per-range buffers is a large measured win.
pub(crate) fn plan_ranges(mut pfns: Vec<u64>) -> (Vec<PfnRange>, usize) {
    let mut ranges: Vec<PfnRange> = Vec::new();
    if pfns.is_empty() {
        return (ranges, 0);
    }
    pfns.sort_unstable();
    pfns.dedup();

    let mut start = pfns[0];
    let mut last = pfns[0];
    for &pfn in &pfns {
        if pfn > last + MAX_GAP_SIZE {
            ranges.push(PfnRange {
                start,
                last,
                use_counts_offset: 0,
                flags_offset: 0,
            });
            start = pfn;
        }
        last = pfn;
    }
    ranges.push(PfnRange {
        start,
        last,
        use_counts_offset: 0,
        flags_offset: 0,
    });

    let mut pos = 0;
    for range in &mut ranges {
        let count = range.word_count();
        range.use_counts_offset = pos;
        pos += count;
        range.flags_offset = pos;
        pos += count;
    }
    (ranges, pos)
}

/// Use counts and frame flags for every planned PFN, read once from
/// `kpagecount`/`kpageflags` and served out of a single flat buffer.
///
/// Lookups may only ask for PFNs that some range covers; anything else is a
/// bug in the caller and asserts.
pub(crate) struct PfnAttrs {
    ranges: Vec<PfnRange>,
    buffer: Vec<u64>,
    // index of the last range consulted; the finalizer walks pages in
    // address order, which mostly follows PFN order, so this hits a lot
    cached: Cell<usize>,
}

impl PfnAttrs {
    /// Issue one positioned read per range per attribute file into the
    /// planned buffer slots. If either file cannot be opened, every lookup
    /// in this session reads as zero.
    pub fn read(root: &Path, ranges: Vec<PfnRange>, total_words: usize) -> PfnAttrs {
        let mut attrs = PfnAttrs {
            ranges,
            buffer: vec![0; total_words],
            cached: Cell::new(0),
        };
        if attrs.ranges.is_empty() {
            return attrs;
        }

        let kpagecount = File::open(root.join("kpagecount"));
        let kpageflags = File::open(root.join("kpageflags"));
        let (kpagecount, kpageflags) = match (kpagecount, kpageflags) {
            (Ok(c), Ok(f)) => (c, f),
            _ => {
                warn!("cannot open kpagecount/kpageflags, frame attributes will read as zero");
                return attrs;
            }
        };

        let mut scratch = Vec::new();
        for i in 0..attrs.ranges.len() {
            let range = attrs.ranges[i];
            let count = range.word_count();
            let byte_offset = (range.start as usize * WORD_BYTES) as i64;
            read_words(
                &kpagecount,
                &mut scratch,
                byte_offset,
                &mut attrs.buffer[range.use_counts_offset..range.use_counts_offset + count],
            );
            read_words(
                &kpageflags,
                &mut scratch,
                byte_offset,
                &mut attrs.buffer[range.flags_offset..range.flags_offset + count],
            );
        }
        attrs
    }

    pub fn use_count(&self, pfn: u64) -> u64 {
        let range = self.find(pfn);
        self.buffer[range.use_counts_offset + (pfn - range.start) as usize]
    }

    pub fn flags(&self, pfn: u64) -> u64 {
        let range = self.find(pfn);
        self.buffer[range.flags_offset + (pfn - range.start) as usize]
    }

    fn find(&self, pfn: u64) -> PfnRange {
        let cached = self.ranges[self.cached.get()];
        if cached.contains(pfn) {
            return cached;
        }
        // lower bound by `last`: the first range whose last covers pfn is
        // the only one that can contain it
        let idx = self.ranges.partition_point(|r| r.last < pfn);
        assert!(
            idx < self.ranges.len() && self.ranges[idx].contains(pfn),
            "PFN {:#x} was never planned",
            pfn
        );
        self.cached.set(idx);
        self.ranges[idx]
    }
}

/// Positioned read of `dest.len()` little-endian words. Short reads and
/// errors leave the unread tail zeroed, which downstream treats as "frame
/// unknown".
fn read_words(file: &File, scratch: &mut Vec<u8>, byte_offset: i64, dest: &mut [u64]) {
    scratch.clear();
    scratch.resize(dest.len() * WORD_BYTES, 0);
    match pread(file, scratch, byte_offset) {
        Ok(_) => LittleEndian::read_u64_into(scratch, dest),
        Err(err) => debug!("positioned read at {} failed: {}", byte_offset, err),
    }
}
