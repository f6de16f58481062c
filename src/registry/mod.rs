//! Connection registry
//!
//! Maps a live logical identity (user or guest, creator or viewer) to its
//! active transport-level connection. The registry is the exclusive owner
//! of [`Connection`] objects: they are created on transport connect,
//! destroyed on disconnect, and everything else refers to them by
//! [`ConnectionId`] only. A stream can have many registered connections at
//! once (one creator, many viewers).

pub mod connection;
pub mod store;

pub use connection::{Connection, ConnectionId, Identity, OutboundSink, Role};
pub use store::ConnectionRegistry;
