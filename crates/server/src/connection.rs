//! Client connection management: read/write pumps, ping/pong, send buffering.

use std::sync::Arc;

use bigfs_protocol::constants::{MessageType, WS_MAX_MESSAGE_SIZE, WS_PING_PERIOD, WS_PONG_WAIT};
use bigfs_protocol::envelope::Message;
use bigfs_protocol::ErrorKind;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::SEND_BUFFER_SIZE;
use crate::handler::Handler;

/// Handle for sending messages to one client.
///
/// Cloneable and cheap; wraps an `mpsc::Sender`.
#[derive(Clone)]
pub struct Sender {
    tx: mpsc::Sender<WsMessage>,
}

impl Sender {
    /// Sends a protocol [`Message`] as JSON text.
    ///
    /// Returns `Err` if the buffer is full or the client disconnected.
    pub fn send_msg(&self, msg: Message) -> Result<(), SendError> {
        let json = serde_json::to_string(&msg).map_err(|_| SendError)?;
        self.tx.try_send(WsMessage::Text(json.into())).map_err(|_| {
            tracing::warn!(id = %msg.id, "send buffer full or closed, dropping reply");
            SendError
        })
    }

    /// Sends a typed error reply for the given request.
    pub fn send_error(
        &self,
        req: &Message,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<(), SendError> {
        self.send_msg(req.reply_error(kind, message))
    }

    /// Returns `true` if the send channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Error returned when the send channel is full or closed.
#[derive(Debug, thiserror::Error)]
#[error("send failed: buffer full or connection closed")]
pub struct SendError;

/// Active connection to a client.
pub struct ClientConnection {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl ClientConnection {
    /// Returns `true` once the read pump has exited.
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    /// Signals shutdown and waits for the read pump to finish.
    pub async fn close_and_wait(self) {
        self.cancel.cancel();
        let _ = self.reader.await;
    }
}

/// Runs the read and write pumps for a WebSocket connection.
///
/// The pumps stop when the client closes, goes silent for longer than
/// [`WS_PONG_WAIT`], or the server token is cancelled.
pub(crate) fn spawn_connection<S, H>(
    ws_stream: S,
    peer: String,
    handler: Arc<H>,
    server_cancel: CancellationToken,
) -> ClientConnection
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Send
        + 'static,
    H: Handler,
{
    let (tx, rx) = mpsc::channel::<WsMessage>(SEND_BUFFER_SIZE);
    let cancel = server_cancel.child_token();
    let sender = Sender { tx };

    let (ws_sink, ws_stream) = ws_stream.split();

    tokio::spawn(write_pump(ws_sink, rx, cancel.clone()));

    let read_cancel = cancel.clone();
    let reader = tokio::spawn(async move {
        read_pump(ws_stream, sender, Arc::clone(&handler), read_cancel.clone()).await;
        read_cancel.cancel();
        handler.on_disconnected(&peer).await;
        tracing::info!(peer = %peer, "client disconnected");
    });

    ClientConnection {
        cancel,
        reader,
    }
}

/// Write pump: drains the send channel and sends WS pings.
async fn write_pump<S>(mut sink: S, mut rx: mpsc::Receiver<WsMessage>, cancel: CancellationToken)
where
    S: futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin,
{
    let mut ping_interval = tokio::time::interval(WS_PING_PERIOD);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = rx.recv() => {
                let Some(ws_msg) = msg else { break };
                if let Err(e) = sink.send(ws_msg).await {
                    tracing::error!("write pump send error: {e}");
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if let Err(e) = sink.send(WsMessage::Ping(Vec::new().into())).await {
                    tracing::error!("write pump ping error: {e}");
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Read pump: reads WS frames and dispatches requests to the handler.
async fn read_pump<S, H>(mut stream: S, sender: Sender, handler: Arc<H>, cancel: CancellationToken)
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Send
        + Unpin,
    H: Handler,
{
    let silence = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(silence);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = &mut silence => {
                tracing::warn!("client silent for {WS_PONG_WAIT:?}, closing connection");
                break;
            }

            frame = stream.next() => {
                let ws_msg = match frame {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        tracing::error!("read pump error: {e}");
                        break;
                    }
                    None => break,
                };
                silence.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                match ws_msg {
                    WsMessage::Text(text) => {
                        if text.len() > WS_MAX_MESSAGE_SIZE {
                            tracing::error!("message exceeds max size ({} > {})", text.len(), WS_MAX_MESSAGE_SIZE);
                            continue;
                        }
                        dispatch_text(&handler, &sender, &text);
                    }
                    WsMessage::Binary(_) => {
                        tracing::warn!("binary frames are not part of the protocol, ignoring");
                    }
                    WsMessage::Close(_) => {
                        tracing::debug!("received close frame");
                        break;
                    }
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
                }
            }
        }
    }
}

/// Parses a text frame and spawns its handler on a task of its own.
fn dispatch_text<H: Handler>(handler: &Arc<H>, sender: &Sender, text: &str) {
    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("invalid message JSON: {e}");
            let _ = sender.send_msg(Message::error(
                "",
                ErrorKind::BadRequest,
                format!("invalid message: {e}"),
            ));
            return;
        }
    };

    let handler = Arc::clone(handler);
    let s = sender.clone();
    tokio::spawn(async move {
        tracing::trace!(id = %msg.id, msg_type = ?msg.msg_type, "dispatching request");
        match msg.msg_type {
            MessageType::Ping => handler.on_ping(s, msg).await,
            MessageType::List => handler.on_list(s, msg).await,
            MessageType::Size => handler.on_size(s, msg).await,
            MessageType::ReadChunk => handler.on_read_chunk(s, msg).await,
            MessageType::Reset => handler.on_reset(s, msg).await,
            MessageType::WriteChunk => handler.on_write_chunk(s, msg).await,
            MessageType::Delete => handler.on_delete(s, msg).await,
            MessageType::Checksum => handler.on_checksum(s, msg).await,
            other => {
                tracing::warn!(msg_type = ?other, "unhandled message type");
                let _ = s.send_error(&msg, ErrorKind::NotImplemented, "unknown message type");
            }
        }
    });
}
