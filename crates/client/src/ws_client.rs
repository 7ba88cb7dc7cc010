//! Request/response client over one WebSocket connection.

use std::collections::HashMap;
use std::sync::Arc;

use bigfs_protocol::constants::{MessageType, WS_MAX_MESSAGE_SIZE, WS_REQUEST_TIMEOUT};
use bigfs_protocol::envelope::Message;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use crate::ClientError;
use crate::pumps::PendingMap;

/// Client connected to a single bigfs server.
///
/// Requests may be issued concurrently from several tasks; replies are
/// matched to requests by message id.
pub struct WsClient {
    write_tx: mpsc::Sender<tungstenite::Message>,
    pending: PendingMap,
    read_handle: tokio::task::JoinHandle<()>,
    write_handle: tokio::task::JoinHandle<()>,
    cancel: CancellationToken,
}

impl WsClient {
    /// Connects to a server at a `ws://host:port` URL.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();
        tracing::debug!(%url, "connected");

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(crate::pumps::write::write_pump(
            write,
            write_rx,
            cancel.clone(),
        ));
        let read_handle = tokio::spawn(crate::pumps::read::read_pump(
            read,
            Arc::clone(&pending),
            cancel.clone(),
        ));

        Ok(Self {
            write_tx,
            pending,
            read_handle,
            write_handle,
            cancel,
        })
    }

    /// Returns `true` while the connection is up.
    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Sends a request and waits for its reply.
    ///
    /// An error envelope is returned as [`ClientError::Remote`].
    pub async fn send_request<T: Serialize>(
        &self,
        msg_type: MessageType,
        payload: Option<&T>,
    ) -> Result<Message, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Closed);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let msg = Message::new(&id, msg_type, payload)?;
        let json = serde_json::to_string(&msg)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if self
            .write_tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::Closed);
        }

        let result = tokio::time::timeout(WS_REQUEST_TIMEOUT, rx).await;

        // Clean up pending entry on any exit path.
        self.pending.lock().await.remove(&id);

        match result {
            Ok(Ok(resp)) => {
                if let Some(err) = resp.error {
                    return Err(ClientError::Remote {
                        kind: err.kind,
                        code: err.code,
                        message: err.message,
                    });
                }
                Ok(resp)
            }
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Sends a request and decodes a reply of type `expected`.
    pub(crate) async fn call<Req, Resp>(
        &self,
        msg_type: MessageType,
        request: &Req,
        expected: MessageType,
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let resp = self.send_request(msg_type, Some(request)).await?;
        if resp.msg_type != expected {
            return Err(ClientError::UnexpectedResponse(resp.msg_type));
        }
        resp.parse_payload::<Resp>()?
            .ok_or(ClientError::UnexpectedResponse(resp.msg_type))
    }

    /// Round-trips a `ping`.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let resp = self.send_request::<()>(MessageType::Ping, None).await?;
        match resp.msg_type {
            MessageType::Pong => Ok(()),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Gracefully closes the connection.
    pub async fn close(&self) {
        self.cancel.cancel();
        let _ = self.write_tx.send(tungstenite::Message::Close(None)).await;
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        self.write_handle.abort();
    }
}
