//! Listening socket and connection lifecycle.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bigfs_protocol::constants::{DEFAULT_PORT, WS_MAX_MESSAGE_SIZE};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async_with_config;
use tokio_util::sync::CancellationToken;

use crate::ServerError;
use crate::connection::{self, ClientConnection};
use crate::handler::Handler;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface address to bind.
    pub bind_addr: String,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: DEFAULT_PORT,
        }
    }
}

/// The bigfs WebSocket server.
///
/// Serves any number of concurrent clients with one shared [`Handler`].
pub struct FileServer<H: Handler> {
    config: ServerConfig,
    handler: Arc<H>,
    connections: Mutex<Vec<ClientConnection>>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<H: Handler> FileServer<H> {
    pub fn new(config: ServerConfig, handler: H) -> Arc<Self> {
        Arc::new(Self {
            config,
            handler: Arc::new(handler),
            connections: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the local address, once [`run`](Self::run) has bound it.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Number of live client connections.
    pub async fn connection_count(&self) -> usize {
        let mut conns = self.connections.lock().await;
        conns.retain(|c| !c.is_finished());
        conns.len()
    }

    /// A token that cancels the server when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Gracefully shuts down the server.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the configured address and serves until cancelled.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Binds the configured address without accepting yet.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let ip: IpAddr = self
            .config
            .bind_addr
            .parse()
            .map_err(|_| ServerError::BindAddr(self.config.bind_addr.clone()))?;
        let listener = TcpListener::bind(SocketAddr::new(ip, self.config.port)).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!("bigfs server listening on {local_addr}");
        Ok(listener)
    }

    /// Accepts connections on `listener` until cancelled.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    let conns = std::mem::take(&mut *self.connections.lock().await);
                    for conn in conns {
                        conn.close_and_wait().await;
                    }
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    tracing::error!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Upgrades one TCP connection to WebSocket and starts its pumps.
    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), ServerError> {
        let mut ws_config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let ws_stream = accept_async_with_config(stream, Some(ws_config)).await?;
        tracing::info!(%peer_addr, "client connected");

        let conn = connection::spawn_connection(
            ws_stream,
            peer_addr.to_string(),
            Arc::clone(&self.handler),
            self.cancel.clone(),
        );

        let mut conns = self.connections.lock().await;
        conns.retain(|c| !c.is_finished());
        conns.push(conn);
        Ok(())
    }
}
