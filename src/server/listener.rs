//! WebSocket signaling listener
//!
//! Handles the accept loop and spawns per-connection tasks. Each socket
//! must introduce itself with a `connect` frame before anything else;
//! after registration a writer task drains the connection's outbound
//! queue while the read loop feeds inbound frames to the hub in arrival
//! order. A socket close or error at any point triggers the hub's
//! idempotent disconnect cleanup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::hub::SignalingHub;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::OutboundSink;
use crate::server::config::ServerConfig;

/// WebSocket front-end for a [`SignalingHub`]
pub struct SignalingServer {
    config: ServerConfig,
    hub: Arc<SignalingHub>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SignalingServer {
    /// Create a new server over the given hub
    pub fn new(config: ServerConfig, hub: Arc<SignalingHub>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub,
            connection_semaphore,
        }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<SignalingHub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let hub = Arc::clone(&self.hub);
        let hello_timeout = self.config.connection_timeout;

        tokio::spawn(async move {
            let _permit = permit; // Held for the connection's lifetime

            if let Err(e) = serve_socket(hub, socket, peer_addr, hello_timeout).await {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }

            tracing::debug!(peer = %peer_addr, "Connection closed");
        });
    }
}

/// Drive one WebSocket from handshake to cleanup
async fn serve_socket(
    hub: Arc<SignalingHub>,
    socket: TcpStream,
    peer_addr: SocketAddr,
    hello_timeout: Duration,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(socket).await?;
    let (mut write, mut read) = ws.split();

    // The first frame must be `connect`, within the deadline
    let (identity, role) = match tokio::time::timeout(hello_timeout, next_event(&mut read)).await {
        Ok(Ok(Some(ClientEvent::Connect { identity, role }))) => (identity, role),
        Ok(Ok(Some(_))) => {
            send_event(
                &mut write,
                &ServerEvent::Error {
                    code: "connect-required".into(),
                    message: "first frame must be connect".into(),
                },
            )
            .await?;
            return Ok(());
        }
        Ok(Ok(None)) => return Ok(()), // Closed before hello
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            tracing::debug!(peer = %peer_addr, "Hello deadline elapsed");
            return Ok(());
        }
    };

    let (sink, mut outbound) = OutboundSink::channel();
    let conn = hub.connect(identity, role, sink).await;
    tracing::info!(connection = %conn, peer = %peer_addr, "Peer registered");

    // Writer task: drain the outbound queue onto the socket. Delivery is
    // fire-and-forget; a dead socket just ends the task.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode outbound event");
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    // Read loop: events are applied in arrival order, one at a time
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => hub.handle_event(conn, event).await,
                Err(e) => {
                    tracing::debug!(connection = %conn, error = %e, "Malformed frame");
                    hub.send_error(conn, "bad-request", "malformed event frame")
                        .await;
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection = %conn, "Binary frame ignored");
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::debug!(connection = %conn, error = %e, "Socket error");
                break;
            }
        }
    }

    hub.disconnect(conn).await;
    writer.abort();
    Ok(())
}

/// Read frames until the next decodable client event, close, or error
async fn next_event(
    read: &mut SplitStream<WebSocketStream<TcpStream>>,
) -> Result<Option<ClientEvent>> {
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

async fn send_event(
    write: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
    event: &ServerEvent,
) -> Result<()> {
    let text = serde_json::to_string(event)?;
    write.send(Message::Text(text)).await?;
    Ok(())
}
