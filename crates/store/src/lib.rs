//! Sandboxed storage behind the bigfs RPC surface.
//!
//! [`FileStore`] is the only component that touches the shared directory.
//! Every client path goes through [`PathSandbox`] first, and every mutating
//! call runs under the [`ConcurrencyGuard`] lock of its resolved path.

mod guard;
mod sandbox;
mod store;

pub use guard::ConcurrencyGuard;
pub use sandbox::PathSandbox;
pub use store::{FileStore, StoreConfig};

use bigfs_protocol::{DecodeError, ErrorKind};
use bigfs_transfer::UnsupportedAlgorithm;

/// Errors produced by the store. Messages name the client-relative path,
/// never the absolute server path.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("path escapes the shared directory: {0}")]
    PathEscape(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("offset mismatch: chunk starts at {expected} but file has {actual} bytes")]
    OffsetMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// The wire-level category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathEscape(_) => ErrorKind::PathEscape,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotADirectory(_) => ErrorKind::NotADirectory,
            Self::Decode(_) => ErrorKind::DecodeError,
            Self::HashMismatch { .. } => ErrorKind::HashMismatch,
            Self::OffsetMismatch { .. } => ErrorKind::OffsetMismatch,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::Io(_) => ErrorKind::IoError,
        }
    }
}
