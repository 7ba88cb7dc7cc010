//! Wire protocol for the bigfs remote file store.
//!
//! Every request and response travels as one JSON [`Message`] envelope in a
//! WebSocket text frame. Binary chunk payloads are base64-encoded (see
//! [`encoding`]).

pub mod constants;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::MessageType;
pub use encoding::{DecodeError, decode_bytes, encode_bytes};
pub use envelope::{Message, WsError};
pub use error::ErrorKind;
