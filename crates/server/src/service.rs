//! [`Handler`] that serves a [`FileStore`] over the wire.

use std::sync::Arc;

use bigfs_protocol::constants::MAX_CHUNK_SIZE;
use bigfs_protocol::envelope::Message;
use bigfs_protocol::messages::{
    AckResponse, ChecksumRequest, ChecksumResponse, ChunkResponse, ListResponse, PathRequest,
    ReadChunkRequest, SizeResponse, WriteChunkRequest,
};
use bigfs_protocol::{ErrorKind, MessageType, decode_bytes, encode_bytes};
use bigfs_store::{FileStore, StoreError};
use bigfs_transfer::{DigestAlgorithm, checksum_bytes};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::connection::Sender;
use crate::handler::{Handler, HandlerFuture};

/// Serves every request type against one shared store.
///
/// Store calls do blocking file I/O and run on the blocking pool.
pub struct FileService {
    store: Arc<FileStore>,
}

impl FileService {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&FileStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

/// Deserializes a required payload, replying `bad_request` on failure.
fn request<T: DeserializeOwned>(sender: &Sender, msg: &Message) -> Option<T> {
    match msg.parse_payload::<T>() {
        Ok(Some(req)) => Some(req),
        Ok(None) => {
            let _ = sender.send_error(msg, ErrorKind::BadRequest, "missing payload");
            None
        }
        Err(e) => {
            let _ = sender.send_error(msg, ErrorKind::BadRequest, format!("invalid payload: {e}"));
            None
        }
    }
}

/// Sends the success payload or the typed error for `result`.
fn respond<T: Serialize>(
    sender: &Sender,
    msg: &Message,
    msg_type: MessageType,
    result: Result<T, StoreError>,
) {
    match result {
        Ok(payload) => match msg.reply(msg_type, Some(&payload)) {
            Ok(reply) => {
                let _ = sender.send_msg(reply);
            }
            Err(e) => {
                tracing::error!(id = %msg.id, "failed to encode reply: {e}");
                let _ = sender.send_error(msg, ErrorKind::IoError, e.to_string());
            }
        },
        Err(e) => {
            match e.kind() {
                ErrorKind::IoError => tracing::error!(id = %msg.id, "request failed: {e}"),
                ErrorKind::PathEscape => tracing::warn!(id = %msg.id, "request rejected: {e}"),
                _ => tracing::debug!(id = %msg.id, "request failed: {e}"),
            }
            let _ = sender.send_error(msg, e.kind(), e.to_string());
        }
    }
}

impl Handler for FileService {
    fn on_list(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            // A bare `list` lists the root.
            let req = match msg.parse_payload::<PathRequest>() {
                Ok(req) => req.unwrap_or(PathRequest {
                    path: String::new(),
                }),
                Err(e) => {
                    let _ = sender.send_error(
                        &msg,
                        ErrorKind::BadRequest,
                        format!("invalid payload: {e}"),
                    );
                    return;
                }
            };
            let result = self
                .blocking(move |store| store.list(&req.path))
                .await
                .map(|entries| ListResponse { entries });
            respond(&sender, &msg, MessageType::ListResponse, result);
        })
    }

    fn on_size(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<PathRequest>(&sender, &msg) else {
                return;
            };
            let result = self
                .blocking(move |store| store.size(&req.path))
                .await
                .map(|size| SizeResponse { size });
            respond(&sender, &msg, MessageType::SizeResponse, result);
        })
    }

    fn on_read_chunk(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<ReadChunkRequest>(&sender, &msg) else {
                return;
            };
            let length = (req.length as usize).min(MAX_CHUNK_SIZE);
            let result = self
                .blocking(move |store| store.read_chunk(&req.path, req.offset, length))
                .await
                .map(|bytes| ChunkResponse {
                    digest: checksum_bytes(&bytes),
                    data: encode_bytes(&bytes),
                });
            respond(&sender, &msg, MessageType::ChunkResponse, result);
        })
    }

    fn on_reset(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<PathRequest>(&sender, &msg) else {
                return;
            };
            let result = self
                .blocking(move |store| {
                    store.reset(&req.path)?;
                    Ok(AckResponse {
                        message: format!("{} reset", req.path),
                    })
                })
                .await;
            respond(&sender, &msg, MessageType::Ack, result);
        })
    }

    fn on_write_chunk(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<WriteChunkRequest>(&sender, &msg) else {
                return;
            };
            let result = match decode_bytes(&req.data) {
                Ok(data) => {
                    self.blocking(move |store| {
                        let len = store.write_chunk(
                            &req.path,
                            &data,
                            req.digest.as_deref(),
                            req.offset,
                        )?;
                        Ok(AckResponse {
                            message: format!("{} bytes written, {len} total", data.len()),
                        })
                    })
                    .await
                }
                Err(e) => Err(StoreError::from(e)),
            };
            respond(&sender, &msg, MessageType::Ack, result);
        })
    }

    fn on_delete(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<PathRequest>(&sender, &msg) else {
                return;
            };
            let result = self
                .blocking(move |store| store.delete(&req.path))
                .await
                .map(|message| AckResponse { message });
            respond(&sender, &msg, MessageType::Ack, result);
        })
    }

    fn on_checksum(&self, sender: Sender, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let Some(req) = request::<ChecksumRequest>(&sender, &msg) else {
                return;
            };
            let algorithm = match req.algorithm.as_deref() {
                None => Ok(DigestAlgorithm::default()),
                Some(name) => name.parse::<DigestAlgorithm>().map_err(StoreError::from),
            };
            let result = match algorithm {
                Ok(algorithm) => {
                    self.blocking(move |store| {
                        let digest = store.checksum(&req.path, algorithm)?;
                        Ok(ChecksumResponse {
                            algorithm: algorithm.name().to_string(),
                            digest,
                        })
                    })
                    .await
                }
                Err(e) => Err(e),
            };
            respond(&sender, &msg, MessageType::ChecksumResponse, result);
        })
    }
}
