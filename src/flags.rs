use bitflags::bitflags;

bitflags! {
    /// Composite per-page flag word.
    ///
    /// Bits 0..=22 are the per-frame flags from `/proc/kpageflags`, kept at
    /// their kernel user-space ABI positions. Bits 28..=31 carry the
    /// per-mapping status bits of the pagemap entry, remapped out of the way
    /// of the frame group (55 -> 28, 61..=63 -> 29..=31). Bits 23..=27 are
    /// reserved and always zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        const LOCKED = 1 << 0;
        const ERROR = 1 << 1;
        const REFERENCED = 1 << 2;
        const UPTODATE = 1 << 3;
        const DIRTY = 1 << 4;
        const LRU = 1 << 5;
        const ACTIVE = 1 << 6;
        const SLAB = 1 << 7;
        const WRITEBACK = 1 << 8;
        const RECLAIM = 1 << 9;
        const BUDDY = 1 << 10;
        const MMAP = 1 << 11;
        const ANON = 1 << 12;
        const SWAPCACHE = 1 << 13;
        const SWAPBACKED = 1 << 14;
        const COMPOUND_HEAD = 1 << 15;
        const COMPOUND_TAIL = 1 << 16;
        const HUGE = 1 << 17;
        const UNEVICTABLE = 1 << 18;
        const HWPOISON = 1 << 19;
        const NOPAGE = 1 << 20;
        const KSM = 1 << 21;
        const THP = 1 << 22;

        const SOFT_DIRTY = 1 << 28;
        const FILE_SHARED_ANON = 1 << 29;
        const SWAPPED = 1 << 30;
        const PRESENT = 1 << 31;
    }
}

/// The part of the `/proc/kpageflags` word that is stable user-space ABI.
/// Everything above bit 22 is masked off so the reserved and remapped groups
/// of the composite word stay clean.
pub const FRAME_FLAG_MASK: u32 = (1 << 23) - 1;
