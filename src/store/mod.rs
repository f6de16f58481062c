//! Persistence collaborator boundary
//!
//! The relational store (users, streams, transactions) lives outside this
//! crate. The signaling core touches it at exactly two points: verifying
//! that a stream id corresponds to a persisted, authorized stream before a
//! session opens, and handing chat/tip events over for asynchronous
//! persistence. Both are fire-and-forget from the core's perspective;
//! their failure must never block or corrupt in-memory session state.

use async_trait::async_trait;

use crate::chat::ChatEvent;
use crate::registry::Identity;
use crate::router::StreamId;

/// External stream catalog and history sink
#[async_trait]
pub trait StreamDirectory: Send + Sync {
    /// Whether `stream` is a persisted stream that `identity` may broadcast
    async fn authorize_stream(&self, stream: &StreamId, identity: &Identity) -> bool;

    /// Hand a chat/tip event over for persistence
    ///
    /// Implementations may spawn; they must not block the caller. The
    /// token ledger side of a tip also happens behind this boundary.
    fn persist_chat(&self, event: ChatEvent);
}

/// Directory that authorizes everything and persists nothing
///
/// Suitable for demos and tests where the platform store is out of scope.
#[derive(Debug, Default, Clone)]
pub struct AllowAll;

#[async_trait]
impl StreamDirectory for AllowAll {
    async fn authorize_stream(&self, _stream: &StreamId, _identity: &Identity) -> bool {
        true
    }

    fn persist_chat(&self, _event: ChatEvent) {}
}
