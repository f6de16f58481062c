//! Signaling router
//!
//! The router delivers WebRTC handshake messages between exactly one
//! creator and one viewer without understanding their contents: it is a
//! lookup-and-forward engine over the connection registry and the stream
//! session table.
//!
//! # Architecture
//!
//! ```text
//!    creator ──offer────▶ ┌────────────────┐ ──offer───▶ viewer
//!    viewer ──answer────▶ │ SignalingRouter│ ──answer──▶ creator
//!    either ──candidate─▶ │  (lookup +     │ ──candidate▶ peer
//!    viewer ──join/leave▶ │   forward)     │ ──viewer-joined,
//!                         └───────┬────────┘    count updates
//!                                 │
//!                         CoreState lookup
//!                      (registry + sessions)
//! ```
//!
//! Signaling messages for one connection are processed in arrival order;
//! there is no cross-viewer ordering guarantee. Each viewer's handshake is
//! independent and idempotent to duplicate or re-ordered join events.

pub mod envelope;
pub mod route;

pub use envelope::{SignalKind, SignalTarget, SignalingEnvelope, StreamId};
pub use route::{handle_join, handle_leave, route, Delivery};
