use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Recommended chunk size for transfers (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Largest chunk the server will return from a single `read_chunk`.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size in bytes (16 MB).
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Time to wait for any incoming frame before the peer is considered dead.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);

/// How often the server pings connected clients.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(5);

/// Timeout for a single request/response round trip.
pub const WS_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP port of the server.
pub const DEFAULT_PORT: u16 = 9090;

/// WebSocket message type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // Requests from client to server
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "read_chunk")]
    ReadChunk,
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "write_chunk")]
    WriteChunk,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "checksum")]
    Checksum,

    // Responses from server to client
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "list_response")]
    ListResponse,
    #[serde(rename = "size_response")]
    SizeResponse,
    #[serde(rename = "chunk_response")]
    ChunkResponse,
    #[serde(rename = "checksum_response")]
    ChecksumResponse,
    #[serde(rename = "ack")]
    Ack,
    #[serde(rename = "error")]
    Error,

    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}

/// Common WebSocket error codes.
pub const WS_ERR_CODE_BAD_REQUEST: i32 = 400;
pub const WS_ERR_CODE_FORBIDDEN: i32 = 403;
pub const WS_ERR_CODE_NOT_FOUND: i32 = 404;
pub const WS_ERR_CODE_CONFLICT: i32 = 409;
pub const WS_ERR_CODE_UNPROCESSABLE: i32 = 422;
pub const WS_ERR_CODE_INTERNAL: i32 = 500;
pub const WS_ERR_CODE_NOT_IMPLEMENTED: i32 = 501;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageType::ReadChunk).unwrap(),
            "\"read_chunk\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::ChecksumResponse).unwrap(),
            "\"checksum_response\""
        );
    }

    #[test]
    fn message_type_deserialization() {
        let mt: MessageType = serde_json::from_str("\"write_chunk\"").unwrap();
        assert_eq!(mt, MessageType::WriteChunk);
    }

    #[test]
    fn unknown_message_type() {
        let mt: MessageType = serde_json::from_str("\"rename\"").unwrap();
        assert_eq!(mt, MessageType::Unknown);
    }

    #[test]
    fn default_chunk_fits_in_frame() {
        // base64 inflates by 4/3; the envelope must still fit.
        assert!(MAX_CHUNK_SIZE * 4 / 3 + 1024 < WS_MAX_MESSAGE_SIZE);
        assert!(DEFAULT_CHUNK_SIZE <= MAX_CHUNK_SIZE);
    }
}
