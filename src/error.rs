use procfs::ProcError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("std::io error: `{0}`")]
    StdIO(#[from] std::io::Error),
    #[error("nix error: `{0}`")]
    Nix(#[from] nix::errno::Errno),
    #[error("Proc error: `{0}`")]
    Proc(#[from] ProcError),

    /// The incoming snapshot stream no longer lines up with the announced
    /// body length. The transport must be closed; there is no way to
    /// re-synchronize.
    #[error("Snapshot stream desynchronized: {0}")]
    Desynchronized(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
