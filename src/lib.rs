pub mod error;
pub mod flags;
pub mod process_list;
pub mod server;
pub mod snapshot;
pub mod summary;
pub mod wire;

pub use error::{Error, Result};
pub use snapshot::{MappedRegion, Snapshot};

/// Page geometry the pagemap pseudo-file is indexed by.
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
