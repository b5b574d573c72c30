use crate::error::Result;

/// The kernel's `comm` field holds at most 15 bytes, so that is all of a
/// process name we can ever see or match against.
pub const MAX_PROCESS_NAME_LEN: usize = 15;

/// A live process and its short executable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPid {
    pub pid: u32,
    pub name: String,
}

/// Enumerate live processes. Processes that disappear mid-scan are skipped;
/// that is the normal churn of a running system, not an error.
pub fn list() -> Result<Vec<ProcessPid>> {
    let mut ret = Vec::new();
    for process in procfs::process::all_processes()? {
        let process = match process {
            Ok(process) => process,
            Err(_) => continue,
        };
        let stat = match process.stat() {
            Ok(stat) => stat,
            Err(_) => continue,
        };
        ret.push(ProcessPid {
            pid: stat.pid as u32,
            name: stat.comm,
        });
    }
    Ok(ret)
}

/// Find a live process by its short executable name. The query is truncated
/// the way the kernel truncates `comm`; the first match wins.
pub fn find_by_name(name: &str) -> Result<Option<ProcessPid>> {
    let query: String = name.chars().take(MAX_PROCESS_NAME_LEN).collect();
    Ok(list()?.into_iter().find(|p| p.name == query))
}
