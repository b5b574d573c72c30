use std::fs;
use std::path::PathBuf;

/// A proc-shaped directory tree for one fake process: `<root>/<pid>/maps`,
/// `<root>/<pid>/pagemap`, `<root>/kpagecount`, `<root>/kpageflags`.
/// Removed again on drop.
pub struct ProcFixture {
    pub root: PathBuf,
    pub pid: u32,
}

impl ProcFixture {
    pub fn new(tag: &str) -> ProcFixture {
        let pid = 4242;
        let root = std::env::temp_dir().join(format!("memstat-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join(pid.to_string())).unwrap();
        ProcFixture { root, pid }
    }

    pub fn write_maps(&self, contents: &str) {
        fs::write(self.root.join(self.pid.to_string()).join("maps"), contents).unwrap();
    }

    /// Write a binary table of 8-byte little-endian words: `entries` maps a
    /// word index (virtual page number or PFN) to a value, everything in
    /// between is zero.
    pub fn write_words(&self, name: &str, entries: &[(u64, u64)]) {
        let path = if name == "pagemap" {
            self.root.join(self.pid.to_string()).join(name)
        } else {
            self.root.join(name)
        };
        let words = entries.iter().map(|&(index, _)| index).max().unwrap_or(0) + 1;
        let mut data = vec![0u8; (words * 8) as usize];
        for &(index, value) in entries {
            data[(index * 8) as usize..][..8].copy_from_slice(&value.to_le_bytes());
        }
        fs::write(path, data).unwrap();
    }
}

impl Drop for ProcFixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
