//! WebSocket client for a bigfs server.
//!
//! [`WsClient`] correlates requests and responses by UUID and implements
//! [`bigfs_transfer::RemoteFs`], so transfer sessions run over it directly.

mod pumps;
mod remote;
mod ws_client;

pub use ws_client::WsClient;

use bigfs_protocol::{ErrorKind, MessageType};
use bigfs_transfer::TransferError;
use tokio_tungstenite::tungstenite;

/// Errors from the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    /// The server answered with an error envelope.
    #[error("{kind}: {message}")]
    Remote {
        kind: ErrorKind,
        code: i32,
        message: String,
    },

    #[error("unexpected {0:?} response")]
    UnexpectedResponse(MessageType),
}

impl ClientError {
    /// The wire-level category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote { kind, .. } => *kind,
            Self::Json(_) | Self::UnexpectedResponse(_) => ErrorKind::BadRequest,
            Self::Ws(_) | Self::Timeout | Self::Closed => ErrorKind::IoError,
        }
    }
}

impl From<ClientError> for TransferError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Remote { kind, message, .. } => TransferError::Remote { kind, message },
            other => TransferError::Transport(other.to_string()),
        }
    }
}
