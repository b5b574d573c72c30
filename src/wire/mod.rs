mod reader;
mod serializer;

pub use reader::SnapshotReader;
pub use serializer::SnapshotSerializer;

use crate::snapshot::MappedRegion;
use crate::PAGE_SIZE;

/// Size of the serializer's staging buffer and of every full slice it
/// returns. Must be at least the padded storage size of the longest
/// backing-file path, because strings are never split across slices; 16 KiB
/// clears any path a kernel will report.
pub const CHUNK_SIZE: usize = 16 * 1024;

pub(crate) const LENGTH_PREFIX_BYTES: usize = 8;

/// Bytes a string occupies on the wire before padding: u32 length plus the
/// raw bytes.
pub(crate) fn string_storage_size(s: &str) -> usize {
    4 + s.len()
}

/// Round a string's storage size up to the next 4-byte boundary.
pub(crate) fn padded_string_storage_size(size: usize) -> usize {
    (size + 3) & !0x3
}

/// Serialized size of a region list: everything after the length prefix.
pub(crate) fn body_size(regions: &[MappedRegion]) -> u64 {
    // the start and end words of every region
    let mut size = regions.len() as u64 * 2 * 8;
    for region in regions {
        // use counts and combined flags
        size += (region.end - region.start) / PAGE_SIZE * 2 * 4;
        size += padded_string_storage_size(string_storage_size(&region.backing_file)) as u64;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_padding_rounds_to_word_boundaries() {
        assert_eq!(padded_string_storage_size(string_storage_size("")), 4);
        assert_eq!(padded_string_storage_size(string_storage_size("abc")), 8);
        assert_eq!(padded_string_storage_size(string_storage_size("abcd")), 8);
        assert_eq!(
            padded_string_storage_size(string_storage_size("/lib/x.so")),
            16
        );
    }

    #[test]
    fn body_size_of_a_four_page_region() {
        let region = MappedRegion {
            start: 0x1000,
            end: 0x5000,
            backing_file: "/lib/x.so".to_owned(),
            use_counts: vec![0; 4],
            combined_flags: vec![0; 4],
        };
        // start + end, padded string, two 16-byte arrays
        assert_eq!(body_size(&[region]), 16 + 16 + 32);
    }

    #[test]
    fn body_size_of_nothing_is_zero() {
        assert_eq!(body_size(&[]), 0);
    }
}
