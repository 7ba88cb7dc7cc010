//! Read pump: routes replies to the requests waiting for them.

use bigfs_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PONG_WAIT};
use bigfs_protocol::envelope::Message;
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::PendingMap;

/// Reads frames until the stream ends, the server goes silent for
/// [`WS_PONG_WAIT`], or `cancel` fires.
///
/// Any incoming frame resets the silence deadline. On exit every pending
/// request is dropped so its waiter observes a closed connection.
pub(crate) async fn read_pump<S>(mut read: S, pending: PendingMap, cancel: CancellationToken)
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut deadline => {
                warn!("server silent for {WS_PONG_WAIT:?}, closing");
                break;
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                };
                deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                match msg {
                    tungstenite::Message::Text(text) => route_reply(&text, &pending).await,
                    tungstenite::Message::Close(_) => {
                        debug!("received close frame");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    cancel.cancel();
    pending.lock().await.clear();
}

/// Hands a reply to the request with the matching id.
async fn route_reply(text: &str, pending: &PendingMap) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to parse message: {e}");
            return;
        }
    };

    trace!(msg_type = ?msg.msg_type, id = %msg.id, "received reply");

    match pending.lock().await.remove(&msg.id) {
        Some(tx) => {
            let _ = tx.send(msg);
        }
        None => warn!(id = %msg.id, "reply for unknown request, dropping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use bigfs_protocol::MessageType;
    use futures_util::stream;
    use tokio::sync::{Mutex, oneshot};

    fn pending_map() -> PendingMap {
        Arc::new(Mutex::new(HashMap::new()))
    }

    #[tokio::test]
    async fn routes_reply_to_pending_request() {
        let pending = pending_map();
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert("req-1".into(), tx);

        let msg = Message::new::<()>("req-1", MessageType::Pong, None).unwrap();
        route_reply(&serde_json::to_string(&msg).unwrap(), &pending).await;

        let resp = rx.await.unwrap();
        assert_eq!(resp.msg_type, MessageType::Pong);
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn ignores_malformed_and_unknown_replies() {
        let pending = pending_map();
        let (tx, _rx) = oneshot::channel();
        pending.lock().await.insert("req-1".into(), tx);

        route_reply("not valid json {{{", &pending).await;
        let stray = Message::new::<()>("other", MessageType::Pong, None).unwrap();
        route_reply(&serde_json::to_string(&stray).unwrap(), &pending).await;

        assert_eq!(pending.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn stream_end_fails_pending_requests() {
        let pending = pending_map();
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert("req-1".into(), tx);

        let empty = stream::empty::<Result<tungstenite::Message, tungstenite::Error>>();
        let cancel = CancellationToken::new();
        read_pump(empty, Arc::clone(&pending), cancel.clone()).await;

        assert!(rx.await.is_err());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn silence_closes_the_pump() {
        let silent = stream::pending::<Result<tungstenite::Message, tungstenite::Error>>();
        let cancel = CancellationToken::new();
        tokio::time::timeout(WS_PONG_WAIT * 2, read_pump(silent, pending_map(), cancel))
            .await
            .expect("pump should exit after the silence deadline");
    }
}
