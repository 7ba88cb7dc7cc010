//! Chunked file transfer: integrity codec, remote store abstraction and the
//! client-side download/upload sessions.
//!
//! A session never holds server-side state. Each chunk is one independent
//! request through [`RemoteFs`], and the session alone tracks the offset.

mod codec;
mod progress;
mod remote;
mod session;
mod types;

pub use bigfs_protocol::ErrorKind;
pub use bigfs_protocol::constants::DEFAULT_CHUNK_SIZE;
pub use codec::{
    DigestAlgorithm, UnsupportedAlgorithm, checksum_bytes, checksum_bytes_with, checksum_file,
    checksum_reader, verify, verify_with,
};
pub use progress::{ProgressCallback, SpeedCalculator, TransferProgress};
pub use remote::{RemoteFs, RemoteFuture};
pub use session::{
    DownloadSession, DownloadState, TransferOptions, UploadSession, UploadState,
    verify_remote_checksum,
};
pub use types::Chunk;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote side answered with a typed failure.
    #[error("{kind}: {message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    #[error(transparent)]
    Decode(#[from] bigfs_protocol::DecodeError),

    /// The request never got an answer (connection closed, timeout).
    #[error("transport error: {0}")]
    Transport(String),
}

impl TransferError {
    /// The wire-level category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Transport(_) => ErrorKind::IoError,
            Self::Remote { kind, .. } => *kind,
            Self::HashMismatch { .. } => ErrorKind::HashMismatch,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::Decode(_) => ErrorKind::DecodeError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_keeps_kind() {
        let err = TransferError::Remote {
            kind: ErrorKind::NotFound,
            message: "a/b.txt".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "no such file or directory: a/b.txt");
    }

    #[test]
    fn local_errors_map_to_kinds() {
        let io = TransferError::from(std::io::Error::other("disk"));
        assert_eq!(io.kind(), ErrorKind::IoError);

        let decode = TransferError::from(bigfs_protocol::DecodeError("bad".into()));
        assert_eq!(decode.kind(), ErrorKind::DecodeError);
    }
}
