use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Payload for requests that only name a path (`list`, `size`, `reset`,
/// `delete`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    #[serde(default)]
    pub path: String,
}

/// Reads up to `length` bytes starting at `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadChunkRequest {
    pub path: String,
    pub offset: u64,
    pub length: u32,
}

/// Appends one chunk to a file.
///
/// `data` is base64 text. Supplying `digest` always makes the server verify
/// the decoded bytes before writing. Supplying `offset` makes the server
/// reject the chunk unless the file is currently exactly that long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteChunkRequest {
    pub path: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// Computes a whole-file digest on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumRequest {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Entry names of a remote directory, in enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub entries: Vec<String>,
}

/// Size of a remote file in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeResponse {
    pub size: u64,
}

/// One chunk of a remote file. An empty `data` marks end of stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub data: String,
    /// SHA-256 hex digest of the decoded bytes.
    pub digest: String,
}

/// Result of a `checksum` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumResponse {
    pub algorithm: String,
    pub digest: String,
}

/// Acknowledgement for mutating requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}
