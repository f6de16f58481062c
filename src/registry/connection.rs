//! Connection types
//!
//! A `Connection` is the transport-level handle for one participant
//! (creator or viewer). Connections are owned exclusively by the
//! [`ConnectionRegistry`](super::ConnectionRegistry); every other structure
//! refers to them by [`ConnectionId`] only.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::protocol::ServerEvent;
use crate::router::StreamId;

/// Unique identifier for a registered connection
///
/// Allocated from a monotonic counter; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical identity behind a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// Authenticated platform user
    User(String),
    /// Anonymous guest session
    Guest(String),
}

impl Identity {
    /// Name shown in chat and on dashboards
    pub fn display_name(&self) -> &str {
        match self {
            Identity::User(name) => name,
            Identity::Guest(id) => id,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::User(name) => write!(f, "user:{}", name),
            Identity::Guest(id) => write!(f, "guest:{}", id),
        }
    }
}

/// Declared role of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Broadcasts a stream
    Creator,
    /// Watches a stream
    Viewer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Creator => write!(f, "creator"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

/// Sending half of a connection's outbound event queue
///
/// Delivery is fire-and-forget: the transport writer drains the queue, and
/// a send to a closed queue means the peer is already gone. That race is
/// normal, not an error.
#[derive(Debug, Clone)]
pub struct OutboundSink {
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl OutboundSink {
    /// Create a sink plus the receiver the transport writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event; returns false when the receiver is gone
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// A registered transport connection
#[derive(Debug)]
pub struct Connection {
    /// Unique connection id
    pub id: ConnectionId,

    /// Who is behind the socket
    pub identity: Identity,

    /// Declared role
    pub role: Role,

    /// Stream this connection is currently associated with
    ///
    /// Non-owning back-reference kept for O(1) cleanup on disconnect.
    pub stream: Option<StreamId>,

    /// Outbound event queue
    sink: OutboundSink,

    /// When the connection registered
    pub connected_at: Instant,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, identity: Identity, role: Role, sink: OutboundSink) -> Self {
        Self {
            id,
            identity,
            role,
            stream: None,
            sink,
            connected_at: Instant::now(),
        }
    }

    /// Queue an outbound event, logging (not failing) when the peer is gone
    pub fn send(&self, event: ServerEvent) {
        if !self.sink.send(event) {
            tracing::trace!(connection = %self.id, "Dropped event for closed connection");
        }
    }

    /// Name shown in chat and on dashboards
    pub fn display_name(&self) -> &str {
        self.identity.display_name()
    }

    /// Check if the connection declared the creator role
    pub fn is_creator(&self) -> bool {
        self.role == Role::Creator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_name() {
        assert_eq!(Identity::User("alice".into()).display_name(), "alice");
        assert_eq!(Identity::Guest("g-17".into()).display_name(), "g-17");
    }

    #[test]
    fn test_sink_send_after_receiver_dropped() {
        let (sink, rx) = OutboundSink::channel();
        drop(rx);

        assert!(!sink.send(ServerEvent::StreamEnded {
            stream_id: StreamId::new("s1"),
        }));
    }

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, mut rx) = OutboundSink::channel();

        for count in 1..=3 {
            assert!(sink.send(ServerEvent::ViewerCountUpdate {
                stream_id: StreamId::new("s1"),
                count,
            }));
        }

        for expected in 1..=3 {
            match rx.try_recv() {
                Ok(ServerEvent::ViewerCountUpdate { count, .. }) => assert_eq!(count, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }
}
