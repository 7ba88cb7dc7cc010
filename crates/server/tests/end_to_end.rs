//! Drives a real server over WebSocket with the bigfs client.

use std::path::Path;
use std::sync::Arc;

use bigfs_client::{ClientError, WsClient};
use bigfs_protocol::constants::MAX_CHUNK_SIZE;
use bigfs_protocol::messages::WriteChunkRequest;
use bigfs_protocol::{ErrorKind, MessageType};
use bigfs_server::{FileServer, FileService, ServerConfig};
use bigfs_store::{FileStore, StoreConfig};
use bigfs_transfer::{
    Chunk, DigestAlgorithm, DownloadSession, RemoteFs, TransferError, TransferOptions,
    UploadSession, checksum_bytes, verify_remote_checksum,
};
use tempfile::TempDir;

struct Harness {
    shared: TempDir,
    server: Arc<FileServer<FileService>>,
    handle: tokio::task::JoinHandle<()>,
    url: String,
}

impl Harness {
    async fn start() -> Self {
        let shared = TempDir::new().unwrap();
        let store = FileStore::open(&StoreConfig {
            root: shared.path().to_path_buf(),
        })
        .unwrap();
        let server = FileServer::new(
            ServerConfig {
                bind_addr: "127.0.0.1".into(),
                port: 0,
            },
            FileService::new(Arc::new(store)),
        );
        let listener = server.bind().await.unwrap();
        let url = format!("ws://127.0.0.1:{}", server.port().await);
        let s = Arc::clone(&server);
        let handle = tokio::spawn(async move {
            s.serve(listener).await.unwrap();
        });
        Self {
            shared,
            server,
            handle,
            url,
        }
    }

    async fn client(&self) -> WsClient {
        WsClient::connect(&self.url).await.unwrap()
    }

    fn shared_path(&self, rel: &str) -> std::path::PathBuf {
        self.shared.path().join(rel)
    }

    async fn stop(self) {
        self.server.shutdown();
        self.handle.await.unwrap();
    }
}

fn remote_kind(err: &TransferError) -> ErrorKind {
    match err {
        TransferError::Remote { kind, .. } => *kind,
        other => panic!("expected a remote error, got {other:?}"),
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn write_local(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[tokio::test]
async fn upload_then_download_is_byte_identical() {
    let h = Harness::start().await;
    let client = h.client().await;
    let local = TempDir::new().unwrap();
    let data = pattern(10_000);
    let src = write_local(local.path(), "src.bin", &data);

    let mut up = UploadSession::new(&client, "nested/dir/copy.bin", TransferOptions::default());
    assert_eq!(up.run(&src).await.unwrap(), 10_000);
    assert_eq!(std::fs::read(h.shared_path("nested/dir/copy.bin")).unwrap(), data);

    let dest = local.path().join("back.bin");
    let mut down =
        DownloadSession::new(&client, "nested/dir/copy.bin", TransferOptions::default());
    assert_eq!(down.run(&dest).await.unwrap(), 10_000);
    assert_eq!(std::fs::read(&dest).unwrap(), data);

    assert!(
        verify_remote_checksum(&client, "nested/dir/copy.bin", &dest)
            .await
            .unwrap()
    );
    h.stop().await;
}

#[tokio::test]
async fn empty_file_round_trip() {
    let h = Harness::start().await;
    let client = h.client().await;
    let local = TempDir::new().unwrap();
    let src = write_local(local.path(), "empty", b"");

    let mut up = UploadSession::new(&client, "empty", TransferOptions::default());
    assert_eq!(up.run(&src).await.unwrap(), 0);
    assert_eq!(client.size("empty").await.unwrap(), 0);

    let dest = local.path().join("empty.back");
    let mut down = DownloadSession::new(&client, "empty", TransferOptions::default());
    assert_eq!(down.run(&dest).await.unwrap(), 0);
    assert!(dest.exists());
    h.stop().await;
}

#[tokio::test]
async fn reset_append_read_scenario() {
    let h = Harness::start().await;
    let client = h.client().await;

    client.reset("a/b.txt").await.unwrap();
    client
        .write_chunk("a/b.txt", Chunk::new(b"hello".to_vec()))
        .await
        .unwrap();
    client
        .write_chunk("a/b.txt", Chunk::new(b" world".to_vec()))
        .await
        .unwrap();

    let chunk = client.read_chunk("a/b.txt", 0, 100).await.unwrap();
    assert_eq!(chunk.data, b"hello world");
    assert!(chunk.verify().is_ok());
    assert_eq!(client.size("a/b.txt").await.unwrap(), 11);

    let tail = client.read_chunk("a/b.txt", 11, 100).await.unwrap();
    assert!(tail.is_empty());
    h.stop().await;
}

#[tokio::test]
async fn corrupted_chunk_is_rejected_and_file_unchanged() {
    let h = Harness::start().await;
    let client = h.client().await;
    client.reset("f").await.unwrap();
    client
        .write_chunk("f", Chunk::new(b"keep".to_vec()).signed())
        .await
        .unwrap();

    let mut bad = Chunk::new(b"tampered".to_vec());
    bad.digest = Some(checksum_bytes(b"original"));
    let err = client.write_chunk("f", bad).await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::HashMismatch);
    assert_eq!(std::fs::read(h.shared_path("f")).unwrap(), b"keep");
    h.stop().await;
}

#[tokio::test]
async fn invalid_base64_is_a_decode_error() {
    let h = Harness::start().await;
    let client = h.client().await;
    let req = WriteChunkRequest {
        path: "f".into(),
        data: "***not base64***".into(),
        digest: None,
        offset: None,
    };
    let err = client
        .send_request(MessageType::WriteChunk, Some(&req))
        .await
        .unwrap_err();
    match err {
        ClientError::Remote { kind, code, .. } => {
            assert_eq!(kind, ErrorKind::DecodeError);
            assert_eq!(code, 400);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!h.shared_path("f").exists());
    h.stop().await;
}

#[tokio::test]
async fn out_of_order_chunk_is_rejected() {
    let h = Harness::start().await;
    let client = h.client().await;
    client.reset("ordered").await.unwrap();
    client
        .write_chunk("ordered", Chunk::new(b"0123".to_vec()).at(0))
        .await
        .unwrap();

    let err = client
        .write_chunk("ordered", Chunk::new(b"0123".to_vec()).at(0))
        .await
        .unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::OffsetMismatch);
    assert_eq!(client.size("ordered").await.unwrap(), 4);
    h.stop().await;
}

#[tokio::test]
async fn delete_twice_reports_not_found() {
    let h = Harness::start().await;
    let client = h.client().await;
    client.reset("gone.txt").await.unwrap();

    assert_eq!(client.delete("gone.txt").await.unwrap(), "gone.txt removed");
    let err = client.delete("gone.txt").await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::NotFound);
    h.stop().await;
}

#[tokio::test]
async fn listing_edge_cases() {
    let h = Harness::start().await;
    let client = h.client().await;

    assert!(client.list("").await.unwrap().is_empty());
    let err = client.list("missing/").await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::NotFound);

    client.reset("docs/readme.md").await.unwrap();
    client.reset("docs/notes.txt").await.unwrap();
    let mut names = client.list("docs").await.unwrap();
    names.sort();
    assert_eq!(names, vec!["notes.txt", "readme.md"]);

    let err = client.list("docs/readme.md").await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::NotADirectory);
    h.stop().await;
}

#[tokio::test]
async fn escapes_are_rejected_over_the_wire() {
    let h = Harness::start().await;
    let client = h.client().await;

    let err = client.reset("../outside.txt").await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::PathEscape);
    assert!(!h.shared.path().parent().unwrap().join("outside.txt").exists());

    let err = client.read_chunk("../../etc/passwd", 0, 64).await.unwrap_err();
    assert_eq!(remote_kind(&err), ErrorKind::PathEscape);
    h.stop().await;
}

#[tokio::test]
async fn oversized_read_is_clamped() {
    let h = Harness::start().await;
    let client = h.client().await;
    std::fs::write(h.shared_path("big.bin"), pattern(MAX_CHUNK_SIZE + 10)).unwrap();

    let chunk = client.read_chunk("big.bin", 0, usize::MAX).await.unwrap();
    assert_eq!(chunk.len(), MAX_CHUNK_SIZE);
    h.stop().await;
}

#[tokio::test]
async fn checksum_over_the_wire() {
    let h = Harness::start().await;
    let client = h.client().await;
    std::fs::write(h.shared_path("sum.txt"), b"hello world").unwrap();

    let digest = client
        .checksum("sum.txt", DigestAlgorithm::Sha256)
        .await
        .unwrap();
    assert_eq!(digest, checksum_bytes(b"hello world"));

    let sha512 = client
        .checksum("sum.txt", DigestAlgorithm::Sha512)
        .await
        .unwrap();
    assert_eq!(sha512.len(), 128);
    h.stop().await;
}

#[tokio::test]
async fn concurrent_uploads_from_two_clients() {
    let h = Harness::start().await;
    let local = TempDir::new().unwrap();
    let a = pattern(50_000);
    let b: Vec<u8> = pattern(50_000).into_iter().rev().collect();
    let src_a = write_local(local.path(), "a", &a);
    let src_b = write_local(local.path(), "b", &b);

    let client_a = h.client().await;
    let client_b = h.client().await;
    let opts = TransferOptions {
        chunk_size: 1000,
        ..TransferOptions::default()
    };

    let mut up_a = UploadSession::new(&client_a, "up/a.bin", opts);
    let mut up_b = UploadSession::new(&client_b, "up/b.bin", opts);
    let (ra, rb) = tokio::join!(up_a.run(&src_a), up_b.run(&src_b));
    ra.unwrap();
    rb.unwrap();

    assert_eq!(std::fs::read(h.shared_path("up/a.bin")).unwrap(), a);
    assert_eq!(std::fs::read(h.shared_path("up/b.bin")).unwrap(), b);
    h.stop().await;
}

#[tokio::test]
async fn ping_round_trip() {
    let h = Harness::start().await;
    let client = h.client().await;
    client.ping().await.unwrap();
    h.stop().await;
}
