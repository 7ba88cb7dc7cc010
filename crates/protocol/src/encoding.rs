//! Text-safe encoding of chunk payloads.

use base64::{Engine, engine::general_purpose::STANDARD};

/// A chunk payload that is not valid base64.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid base64 payload: {0}")]
pub struct DecodeError(pub String);

/// Encodes raw bytes for transport inside a JSON string.
pub fn encode_bytes(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes a base64 payload back into raw bytes.
pub fn decode_bytes(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(text)
        .map_err(|e| DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_encodes_to_empty_string() {
        assert_eq!(encode_bytes(&[]), "");
        assert!(decode_bytes("").unwrap().is_empty());
    }

    #[test]
    fn binary_survives_encoding() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode_bytes(&encode_bytes(&data)).unwrap(), data);
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_bytes("not*base64!").unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn rejects_truncated_padding() {
        assert!(decode_bytes("aGVsbG8").is_err());
    }
}
