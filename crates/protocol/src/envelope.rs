use serde::{Deserialize, Serialize};

use crate::constants::MessageType;
use crate::error::ErrorKind;

/// Error details in a WebSocket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsError {
    pub code: i32,
    pub kind: ErrorKind,
    pub message: String,
}

/// Envelope for all WebSocket communication.
///
/// The `payload` field uses `serde_json::value::RawValue` to defer
/// deserialization until the receiver knows the message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WsError>,
}

impl Message {
    /// Creates a new message with the given type and payload.
    pub fn new<T: Serialize>(
        id: impl Into<String>,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        let raw = match payload {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                Some(serde_json::value::RawValue::from_string(json)?)
            }
            None => None,
        };
        Ok(Self {
            id: id.into(),
            msg_type,
            payload: raw,
            error: None,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.payload {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }

    /// Creates an error message.
    pub fn error(id: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg_type: MessageType::Error,
            payload: None,
            error: Some(WsError {
                code: kind.code(),
                kind,
                message: message.into(),
            }),
        }
    }

    /// Creates a response message for this request.
    pub fn reply<T: Serialize>(
        &self,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Self, serde_json::Error> {
        Message::new(&self.id, msg_type, payload)
    }

    /// Creates an error response for this request.
    pub fn reply_error(&self, kind: ErrorKind, message: impl Into<String>) -> Self {
        Message::error(&self.id, kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{PathRequest, SizeResponse};

    #[test]
    fn message_new_with_payload() {
        let req = PathRequest {
            path: "docs/a.txt".into(),
        };
        let msg = Message::new("msg-1", MessageType::Size, Some(&req)).unwrap();
        assert_eq!(msg.id, "msg-1");
        assert_eq!(msg.msg_type, MessageType::Size);
        assert!(msg.payload.is_some());
        assert!(msg.error.is_none());
    }

    #[test]
    fn message_new_without_payload() {
        let msg = Message::new::<()>("msg-2", MessageType::Ping, None).unwrap();
        assert!(msg.payload.is_none());
    }

    #[test]
    fn message_error_carries_kind_and_code() {
        let msg = Message::error("msg-3", ErrorKind::NotFound, "missing.txt");
        assert_eq!(msg.msg_type, MessageType::Error);
        let err = msg.error.unwrap();
        assert_eq!(err.code, 404);
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "missing.txt");
    }

    #[test]
    fn message_parse_payload() {
        let msg = Message::new("m1", MessageType::SizeResponse, Some(&SizeResponse { size: 11 }))
            .unwrap();
        let parsed: Option<SizeResponse> = msg.parse_payload().unwrap();
        assert_eq!(parsed.unwrap().size, 11);
    }

    #[test]
    fn error_envelope_json_shape() {
        let msg = Message::error("e1", ErrorKind::HashMismatch, "digest differs");
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"]["kind"], "hash_mismatch");
        assert_eq!(json["error"]["code"], 422);
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn reply_preserves_id() {
        let original = Message::new::<()>("req-42", MessageType::Ping, None).unwrap();
        let reply = original.reply::<()>(MessageType::Pong, None).unwrap();
        assert_eq!(reply.id, "req-42");
        assert_eq!(reply.msg_type, MessageType::Pong);

        let err = original.reply_error(ErrorKind::BadRequest, "nope");
        assert_eq!(err.id, "req-42");
        assert_eq!(err.msg_type, MessageType::Error);
    }
}
