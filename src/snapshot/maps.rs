use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use super::MappedRegion;

/// One line per mapping: `START-END PERMS OFFSET DEV INODE [PATH]`, hex
/// addresses. Anything that does not parse is dropped; the file changes
/// underneath us while the process runs, so a bad line is not worth more
/// than a debug message.
fn parse_line(line: &str) -> Option<MappedRegion> {
    let mut fields = line.split_whitespace();
    let (start, end) = fields.next()?.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end < start {
        return None;
    }
    // skip perms, offset, dev and inode; the trailing path may be absent
    let backing_file = fields.nth(4).unwrap_or("").to_owned();
    let mut region = MappedRegion {
        start,
        end,
        backing_file,
        ..Default::default()
    };
    let page_count = region.page_count();
    region.use_counts = vec![0; page_count];
    region.combined_flags = vec![0; page_count];
    Some(region)
}

/// Read the memory map of `pid`, in file order, which is ascending address
/// order. The per-page arrays come back sized but still all zero. An
/// unopenable file yields an empty list.
pub(crate) fn read_mapped_regions(root: &Path, pid: u32) -> Vec<MappedRegion> {
    let path = root.join(pid.to_string()).join("maps");
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!("cannot open {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    let mut ret = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        match parse_line(&line) {
            Some(region) => ret.push(region),
            None => debug!("skipping unparsable map line: {}", line),
        }
    }
    ret
}
