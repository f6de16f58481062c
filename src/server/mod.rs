//! WebSocket server front-end
//!
//! The transport layer around the signaling core: a TCP accept loop that
//! upgrades sockets to WebSocket, registers them with the hub, and shuttles
//! JSON event frames in both directions.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::SignalingServer;
