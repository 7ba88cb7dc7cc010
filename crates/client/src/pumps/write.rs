//! Write pump: serialises outbound frames and keeps the link alive.

use bigfs_protocol::constants::WS_PING_PERIOD;
use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Writes queued frames and sends a ping every [`WS_PING_PERIOD`].
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut ping = tokio::time::interval(WS_PING_PERIOD);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                let Some(m) = msg else { break };
                if let Err(e) = write.send(m).await {
                    error!("WebSocket write error: {e}");
                    break;
                }
            }
            _ = ping.tick() => {
                if let Err(e) = write.send(tungstenite::Message::Ping(Vec::new().into())).await {
                    error!("WebSocket ping error: {e}");
                    break;
                }
            }
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink;

    fn capture() -> (
        impl SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
        mpsc::Receiver<tungstenite::Message>,
    ) {
        let (sink_tx, sink_rx) = mpsc::channel::<tungstenite::Message>(16);
        let sink = sink::unfold(sink_tx, |tx, msg: tungstenite::Message| async move {
            let _ = tx.send(msg).await;
            Ok::<_, tungstenite::Error>(tx)
        });
        (Box::pin(sink), sink_rx)
    }

    #[tokio::test]
    async fn forwards_frames_then_closes_on_cancel() {
        let (sink, mut sink_rx) = capture();
        let cancel = CancellationToken::new();
        let (write_tx, write_rx) = mpsc::channel(16);

        let c = cancel.clone();
        let handle = tokio::spawn(async move { write_pump(sink, write_rx, c).await });

        write_tx
            .send(tungstenite::Message::Text("hello".into()))
            .await
            .unwrap();
        let first = sink_rx.recv().await.unwrap();
        assert!(matches!(first, tungstenite::Message::Text(t) if t.as_str() == "hello"));

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");

        let close_msg = sink_rx.recv().await;
        assert!(matches!(close_msg, Some(tungstenite::Message::Close(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn pings_periodically() {
        let (sink, mut sink_rx) = capture();
        let cancel = CancellationToken::new();
        let (_write_tx, write_rx) = mpsc::channel(16);

        let c = cancel.clone();
        tokio::spawn(async move { write_pump(sink, write_rx, c).await });

        let frame = tokio::time::timeout(WS_PING_PERIOD * 2, sink_rx.recv())
            .await
            .expect("ping should be sent")
            .unwrap();
        assert!(matches!(frame, tungstenite::Message::Ping(_)));
        cancel.cancel();
    }
}
