use std::fs::File;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use nix::sys::uio::pread;

use super::MappedRegion;
use crate::PAGE_SIZE;

// Bit layout of one 8-byte pagemap entry, stable user-space ABI.
pub(crate) const PM_PRESENT: u64 = 1 << 63;
pub(crate) const PM_SWAP: u64 = 1 << 62;
pub(crate) const PM_FILE_SHARED_ANON: u64 = 1 << 61;
pub(crate) const PM_SOFT_DIRTY: u64 = 1 << 55;
pub(crate) const PM_PFRAME_MASK: u64 = (1 << 55) - 1;

const ENTRY_BYTES: u64 = 8;

/// PFN of a pagemap entry, for entries that describe a present page.
pub(crate) fn pfn_of(entry: u64) -> Option<u64> {
    if entry & PM_PRESENT == 0 {
        return None;
    }
    match entry & PM_PFRAME_MASK {
        0 => None,
        pfn => Some(pfn),
    }
}

/// Remap the pagemap status bits into the composite flag word:
/// bit 55 -> 28, bits 61..=63 -> 29..=31.
pub(crate) fn entry_flag_bits(entry: u64) -> u32 {
    (((entry >> 27) & (PM_SOFT_DIRTY >> 27))
        | ((entry >> 32) & ((PM_FILE_SHARED_ANON | PM_SWAP | PM_PRESENT) >> 32))) as u32
}

pub(crate) struct PagemapScan {
    /// Every present PFN seen across all regions, unsorted, duplicates and
    /// all. Empty when the pagemap could not be opened.
    pub pfns: Vec<u64>,
    /// Raw pagemap entries per region, index-aligned with the region list.
    pub entries: Vec<Vec<u64>>,
}

/// Read each region's slice of the pagemap with one positioned read and
/// fill in the pagemap-sourced flag bits. Frame flags get merged in later.
pub(crate) fn scan(root: &Path, pid: u32, regions: &mut [MappedRegion]) -> PagemapScan {
    let mut ret = PagemapScan {
        pfns: Vec::new(),
        entries: Vec::new(),
    };

    let path = root.join(pid.to_string()).join("pagemap");
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!("cannot open {}: {}", path.display(), err);
            return ret;
        }
    };

    let mut raw = Vec::new();
    for region in regions.iter_mut() {
        let page_count = region.page_count();
        let mut entries = vec![0u64; page_count];

        raw.clear();
        raw.resize(page_count * ENTRY_BYTES as usize, 0);
        let offset = (region.start / PAGE_SIZE) * ENTRY_BYTES;
        match pread(&file, &mut raw, offset as i64) {
            // a short read happens when the mapping was torn down mid-pass;
            // the unread tail stays zero, i.e. not present
            Ok(_) => LittleEndian::read_u64_into(&raw, &mut entries),
            Err(err) => debug!(
                "pagemap read for {:x}..{:x} failed: {}",
                region.start, region.end, err
            ),
        }

        for (i, &entry) in entries.iter().enumerate() {
            if let Some(pfn) = pfn_of(entry) {
                ret.pfns.push(pfn);
            }
            region.combined_flags[i] = entry_flag_bits(entry);
        }
        ret.entries.push(entries);
    }
    ret
}
