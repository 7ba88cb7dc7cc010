//! WebSocket RPC server for bigfs.
//!
//! Accepts any number of client connections, decodes JSON envelopes and
//! dispatches them to a [`Handler`]. [`FileService`] is the handler that
//! serves a [`bigfs_store::FileStore`]. Every request runs as its own task,
//! so a slow checksum never stalls other requests on the same connection.

mod connection;
mod handler;
mod server;
mod service;

pub use connection::{ClientConnection, SendError, Sender};
pub use handler::{Handler, HandlerFuture};
pub use server::{FileServer, ServerConfig};
pub use service::FileService;

/// Send buffer capacity per connection.
pub const SEND_BUFFER_SIZE: usize = 1024;

/// Errors produced by the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bind address: {0}")]
    BindAddr(String),
}
