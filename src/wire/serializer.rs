use byteorder::{ByteOrder, LittleEndian};

use super::{body_size, padded_string_storage_size, string_storage_size, CHUNK_SIZE};
use crate::snapshot::{MappedRegion, Snapshot};

/// Resumable encoder for one snapshot.
///
/// [`serialize_more`](Self::serialize_more) hands out the wire stream piece
/// by piece; an empty slice marks the end. Between calls the serializer
/// keeps a region index and a byte cursor into that region's serialized
/// layout, so a field that did not fit is simply re-attempted by the next
/// call. Fields larger than a slice cannot happen: strings are bounded by
/// [`CHUNK_SIZE`] and arrays are split at arbitrary byte positions.
///
/// When a whole slice can be served from the middle of a per-page array, it
/// is borrowed straight out of the snapshot instead of being copied.
pub struct SnapshotSerializer<'a> {
    regions: &'a [MappedRegion],
    /// Current region; regions.len() means done.
    region: usize,
    /// Byte cursor within the current region's serialized layout.
    pos_in_region: usize,
    length_prefix_emitted: bool,
    buf: Vec<u8>,
}

impl<'a> SnapshotSerializer<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        SnapshotSerializer {
            regions: &snapshot.regions,
            region: 0,
            pos_in_region: 0,
            length_prefix_emitted: false,
            buf: vec![0; CHUNK_SIZE],
        }
    }

    fn next_region(&mut self) {
        self.pos_in_region = 0;
        self.region += 1;
    }

    /// The next contiguous piece of the wire stream. Empty means the
    /// snapshot has been emitted completely.
    pub fn serialize_more(&mut self) -> &[u8] {
        let mut buf_pos = 0;

        if !self.length_prefix_emitted {
            LittleEndian::write_u64(&mut self.buf[..8], body_size(self.regions));
            buf_pos = 8;
            self.length_prefix_emitted = true;
        }

        let regions = self.regions;
        // keep writing members until the buffer is full, the snapshot ends,
        // or the current member needs a fresh buffer to itself
        let mut wrote = true;
        while wrote && self.region < regions.len() && buf_pos < CHUNK_SIZE {
            wrote = false;
            let region = &regions[self.region];

            // member_offset tracks the static field layout; place_* compare
            // it against the cursor so a resumed call skips finished fields
            let mut member_offset = 0;
            wrote |= place_u64(
                &mut self.buf,
                &mut buf_pos,
                &mut self.pos_in_region,
                &mut member_offset,
                region.start,
            );
            wrote |= place_u64(
                &mut self.buf,
                &mut buf_pos,
                &mut self.pos_in_region,
                &mut member_offset,
                region.end,
            );
            wrote |= place_string(
                &mut self.buf,
                &mut buf_pos,
                &mut self.pos_in_region,
                &mut member_offset,
                &region.backing_file,
            );

            if self.pos_in_region < member_offset {
                continue; // still inside the fixed members
            }

            let array_size = region.page_count() * 4;
            if array_size == 0 {
                // an overlap-corrected empty region has no arrays at all
                self.next_region();
                wrote = true;
                continue;
            }

            let in_flags = self.pos_in_region >= member_offset + array_size;
            if in_flags {
                member_offset += array_size;
            }
            let array_end = member_offset + array_size;
            debug_assert!(self.pos_in_region < array_end);

            let words: &[u32] = if in_flags {
                &region.combined_flags
            } else {
                &region.use_counts
            };
            let data = &array_bytes(words)[self.pos_in_region - member_offset..];

            if buf_pos == 0 && self.pos_in_region + CHUNK_SIZE <= array_end {
                // zero-copy fast path: hand out a slice of the snapshot's
                // own array storage; the borrow makes the caller consume it
                // before asking for more
                self.pos_in_region += CHUNK_SIZE;
                if in_flags && self.pos_in_region >= array_end {
                    self.next_region();
                }
                return &data[..CHUNK_SIZE];
            }

            let amount = (CHUNK_SIZE - buf_pos).min(array_end - self.pos_in_region);
            self.buf[buf_pos..buf_pos + amount].copy_from_slice(&data[..amount]);
            self.pos_in_region += amount;
            buf_pos += amount;
            wrote = true;

            // finishing use_counts leaves the cursor at the start of
            // combined_flags, which the next loop iteration picks up
            if in_flags && self.pos_in_region >= array_end {
                self.next_region();
            }
        }

        &self.buf[..buf_pos]
    }
}

/// The protocol is little-endian with no negotiation and only targets
/// little-endian machines, so the in-memory arrays are already in wire
/// order.
fn array_bytes(words: &[u32]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(words.as_ptr().cast(), words.len() * 4) }
}

fn place_u64(
    buf: &mut [u8],
    buf_pos: &mut usize,
    pos_in_region: &mut usize,
    member_offset: &mut usize,
    value: u64,
) -> bool {
    let at_member = *member_offset == *pos_in_region;
    *member_offset += 8;
    if !at_member || *buf_pos + 8 > CHUNK_SIZE {
        return false;
    }
    LittleEndian::write_u64(&mut buf[*buf_pos..*buf_pos + 8], value);
    *buf_pos += 8;
    *pos_in_region += 8;
    true
}

fn place_string(
    buf: &mut [u8],
    buf_pos: &mut usize,
    pos_in_region: &mut usize,
    member_offset: &mut usize,
    s: &str,
) -> bool {
    let size = string_storage_size(s);
    let padded = padded_string_storage_size(size);
    let at_member = *member_offset == *pos_in_region;
    *member_offset += padded;
    if !at_member || *buf_pos + padded > CHUNK_SIZE {
        return false;
    }
    LittleEndian::write_u32(&mut buf[*buf_pos..*buf_pos + 4], s.len() as u32);
    buf[*buf_pos + 4..*buf_pos + size].copy_from_slice(s.as_bytes());
    buf[*buf_pos + size..*buf_pos + padded].fill(0);
    *buf_pos += padded;
    *pos_in_region += padded;
    true
}
