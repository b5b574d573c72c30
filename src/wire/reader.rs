use byteorder::{ByteOrder, LittleEndian};

use super::{padded_string_storage_size, LENGTH_PREFIX_BYTES};
use crate::error::{Error, Result};
use crate::snapshot::{MappedRegion, Snapshot};
use crate::PAGE_SIZE;

/// Incremental decoder for the snapshot wire stream.
///
/// Accepts received bytes in whatever pieces the transport delivers,
/// including splits inside the length prefix, a string, or an array. Whole
/// snapshots come out; partial ones never do.
#[derive(Debug, Default)]
pub struct SnapshotReader {
    expected_len: Option<u64>,
    buffer: Vec<u8>,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received chunk. Returns the snapshots it completed, in
    /// stream order. A decode error means the stream is desynchronized and
    /// the transport should be closed.
    pub fn add_data(&mut self, chunk: &[u8]) -> Result<Vec<Snapshot>> {
        self.buffer.extend_from_slice(chunk);

        let mut completed = Vec::new();
        loop {
            if self.expected_len.is_none() && self.buffer.len() >= LENGTH_PREFIX_BYTES {
                self.expected_len = Some(LittleEndian::read_u64(&self.buffer[..8]));
            }
            let len = match self.expected_len {
                Some(len) => len as usize,
                None => break,
            };
            let total = match LENGTH_PREFIX_BYTES.checked_add(len) {
                Some(total) => total,
                None => return Err(Error::Desynchronized("announced body length is absurd")),
            };
            if self.buffer.len() < total {
                break;
            }
            completed.push(parse_body(&self.buffer[LENGTH_PREFIX_BYTES..total])?);
            self.buffer.drain(..total);
            self.expected_len = None;
        }
        Ok(completed)
    }
}

fn parse_body(mut body: &[u8]) -> Result<Snapshot> {
    let mut regions = Vec::new();
    while !body.is_empty() {
        regions.push(parse_region(&mut body)?);
    }
    Ok(Snapshot { regions })
}

fn take<'b>(body: &mut &'b [u8], n: usize) -> Result<&'b [u8]> {
    if body.len() < n {
        return Err(Error::Desynchronized(
            "field overruns the announced body length",
        ));
    }
    let (head, tail) = body.split_at(n);
    *body = tail;
    Ok(head)
}

fn parse_region(body: &mut &[u8]) -> Result<MappedRegion> {
    let start = LittleEndian::read_u64(take(body, 8)?);
    let end = LittleEndian::read_u64(take(body, 8)?);
    if end < start || (end - start) % PAGE_SIZE != 0 {
        return Err(Error::Desynchronized("region bounds are not page-aligned"));
    }

    let name_len = LittleEndian::read_u32(take(body, 4)?) as usize;
    let backing_file = String::from_utf8_lossy(take(body, name_len)?).into_owned();
    let pad = padded_string_storage_size(4 + name_len) - (4 + name_len);
    take(body, pad)?;

    let page_count = ((end - start) / PAGE_SIZE) as usize;
    let array_bytes = page_count
        .checked_mul(4)
        .ok_or(Error::Desynchronized("region spans an absurd page count"))?;

    let raw_counts = take(body, array_bytes)?;
    let mut use_counts = vec![0u32; page_count];
    LittleEndian::read_u32_into(raw_counts, &mut use_counts);

    let raw_flags = take(body, array_bytes)?;
    let mut combined_flags = vec![0u32; page_count];
    LittleEndian::read_u32_into(raw_flags, &mut combined_flags);

    Ok(MappedRegion {
        start,
        end,
        backing_file,
        use_counts,
        combined_flags,
    })
}
