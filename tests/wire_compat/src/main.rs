fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use bigfs_protocol::messages::{
        AckResponse, ChecksumRequest, ChecksumResponse, ChunkResponse, ListResponse,
        ReadChunkRequest, SizeResponse, WriteChunkRequest,
    };
    use bigfs_protocol::{ErrorKind, Message, MessageType};

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Parses a fixture into `T`, re-serializes it and compares the JSON
    /// values (key order independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let text = load_fixture(name);
        let fixture: serde_json::Value = serde_json::from_str(&text).unwrap();
        let parsed: T = serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    #[test]
    fn request_envelope() {
        let msg: Message = roundtrip_test("request_envelope.json");
        assert_eq!(msg.msg_type, MessageType::ReadChunk);
        let req: ReadChunkRequest = msg.parse_payload().unwrap().unwrap();
        assert_eq!(req.offset, 8192);
        assert_eq!(req.length, 4096);
    }

    #[test]
    fn error_envelope() {
        let msg: Message = roundtrip_test("error_envelope.json");
        let err = msg.error.unwrap();
        assert_eq!(err.kind, ErrorKind::PathEscape);
        assert_eq!(err.code, ErrorKind::PathEscape.code());
        assert!(msg.payload.is_none());
    }

    #[test]
    fn error_envelope_is_built_the_same_way() {
        let text = load_fixture("error_envelope.json");
        let fixture: serde_json::Value = serde_json::from_str(&text).unwrap();
        let built = Message::error(
            "6f1c2a4e-8d0b-4c55-9d8e-0c1e4b7f2a10",
            ErrorKind::PathEscape,
            "path escapes the shared directory: ../etc/passwd",
        );
        assert_eq!(serde_json::to_value(&built).unwrap(), fixture);
    }

    #[test]
    fn write_chunk_request_full_and_minimal() {
        let full: WriteChunkRequest = roundtrip_test("write_chunk_request.json");
        assert_eq!(full.offset, Some(4096));
        assert!(full.digest.is_some());

        let minimal: WriteChunkRequest = roundtrip_test("write_chunk_request_minimal.json");
        assert_eq!(minimal.offset, None);
        assert_eq!(minimal.digest, None);
    }

    #[test]
    fn response_payloads() {
        roundtrip_test::<ChunkResponse>("chunk_response.json");
        roundtrip_test::<ChecksumRequest>("checksum_request.json");
        roundtrip_test::<ChecksumResponse>("checksum_response.json");
        roundtrip_test::<SizeResponse>("size_response.json");
        roundtrip_test::<AckResponse>("ack_response.json");

        let list: ListResponse = roundtrip_test("list_response.json");
        assert_eq!(list.entries.len(), 3);
    }

    #[test]
    fn unknown_message_type_is_tolerated() {
        let msg: Message = serde_json::from_str(r#"{"id":"x","type":"mount_volume"}"#).unwrap();
        assert_eq!(msg.msg_type, MessageType::Unknown);
    }
}
