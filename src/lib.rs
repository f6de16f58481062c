//! WebRTC signaling and live session coordination
//!
//! `signaling-rs` is the real-time core of a live-streaming platform: it
//! tracks which streams are live, routes offer/answer/ICE signaling between
//! exactly the right creator and viewer sockets, keeps authoritative viewer
//! counts and bounded chat history per stream, and cleans everything up
//! when a socket drops mid-handshake.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<SignalingHub>
//!                     ┌─────────────────────────┐
//!                     │ RwLock<CoreState> {     │
//!                     │   registry: Connection  │
//!                     │             Registry,   │
//!                     │   sessions: Session     │
//!                     │             Table,      │
//!                     │ }                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────┬───────┴───────┬───────────────┐
//!         ▼               ▼               ▼               ▼
//!    [Router]        [Presence]     [Chat fan-out]   [Transport]
//!    offer/answer    count updates  history + tips   channel grants
//! ```
//!
//! All mutation for one inbound event happens under a single write lock,
//! so counts and membership can never be observed mid-update. Outbound
//! delivery is fire-and-forget through per-connection queues; a peer that
//! vanished mid-handshake is a normal race, not an error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use signaling_rs::{HubConfig, ServerConfig, SignalingHub, SignalingServer};
//!
//! #[tokio::main]
//! async fn main() -> signaling_rs::Result<()> {
//!     let hub = Arc::new(SignalingHub::new(HubConfig::default()));
//!     let server = SignalingServer::new(ServerConfig::default(), hub);
//!     server.run().await
//! }
//! ```

pub mod chat;
pub mod error;
pub mod hub;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
pub mod transport;

pub use chat::ChatEvent;
pub use error::{Error, Result};
pub use hub::{HubConfig, SignalingHub};
pub use protocol::{ClientEvent, ServerEvent};
pub use registry::{Connection, ConnectionId, ConnectionRegistry, Identity, OutboundSink, Role};
pub use router::{SignalKind, SignalTarget, SignalingEnvelope, StreamId};
pub use server::{ServerConfig, SignalingServer};
pub use session::{SessionError, SessionTable, StreamSession};
pub use state::CoreState;
pub use transport::{AccessTokenProvider, ChannelGrant, TransportKind};
