use serde::{Deserialize, Serialize};

use crate::constants::{
    WS_ERR_CODE_BAD_REQUEST, WS_ERR_CODE_CONFLICT, WS_ERR_CODE_FORBIDDEN, WS_ERR_CODE_INTERNAL,
    WS_ERR_CODE_NOT_FOUND, WS_ERR_CODE_NOT_IMPLEMENTED, WS_ERR_CODE_UNPROCESSABLE,
};

/// Failure category carried in every error envelope.
///
/// Both ends keep this value intact so that only the presentation layer
/// decides how much detail to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The path would leave the shared root.
    PathEscape,
    NotFound,
    NotADirectory,
    /// A chunk payload was not valid base64.
    DecodeError,
    /// A chunk did not match its accompanying digest.
    HashMismatch,
    /// A chunk was addressed to an offset other than the current file length.
    OffsetMismatch,
    UnsupportedAlgorithm,
    /// The request envelope or payload was malformed.
    BadRequest,
    IoError,
    NotImplemented,
    #[serde(other)]
    Unknown,
}

impl ErrorKind {
    /// HTTP-like status code used in the envelope.
    pub fn code(self) -> i32 {
        match self {
            Self::PathEscape => WS_ERR_CODE_FORBIDDEN,
            Self::NotFound => WS_ERR_CODE_NOT_FOUND,
            Self::NotADirectory | Self::DecodeError | Self::BadRequest => WS_ERR_CODE_BAD_REQUEST,
            Self::HashMismatch | Self::UnsupportedAlgorithm => WS_ERR_CODE_UNPROCESSABLE,
            Self::OffsetMismatch => WS_ERR_CODE_CONFLICT,
            Self::NotImplemented => WS_ERR_CODE_NOT_IMPLEMENTED,
            Self::IoError | Self::Unknown => WS_ERR_CODE_INTERNAL,
        }
    }

    /// Short human-readable label.
    pub fn describe(self) -> &'static str {
        match self {
            Self::PathEscape => "path outside the shared directory",
            Self::NotFound => "no such file or directory",
            Self::NotADirectory => "not a directory",
            Self::DecodeError => "malformed chunk encoding",
            Self::HashMismatch => "chunk integrity check failed",
            Self::OffsetMismatch => "chunk out of order",
            Self::UnsupportedAlgorithm => "unsupported checksum algorithm",
            Self::BadRequest => "bad request",
            Self::IoError => "storage error",
            Self::NotImplemented => "operation not supported",
            Self::Unknown => "unknown error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}
