//! Signaling envelope types
//!
//! This module defines the key types for identifying streams and the
//! transient envelopes the router carries between connections. An envelope
//! exists only for the duration of routing; it is never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ConnectionId;

/// Unique identifier for a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new stream id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Payload kind of a signaling message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// WebRTC offer, always creator to viewer
    Offer,
    /// WebRTC answer, always viewer to creator
    Answer,
    /// ICE candidate, either direction
    IceCandidate,
    /// Viewer wants to join a stream
    Join,
    /// Viewer leaves a stream
    Leave,
}

impl SignalKind {
    /// Wire name of the kind, for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
            SignalKind::Join => "join",
            SignalKind::Leave => "leave",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a signaling message is headed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalTarget {
    /// Exactly one counterpart connection
    Connection(ConnectionId),
    /// Every member of a stream
    Stream(StreamId),
}

/// A transient signaling message in flight through the router
///
/// The payload is opaque: the router forwards it verbatim and never looks
/// inside.
#[derive(Debug, Clone)]
pub struct SignalingEnvelope {
    /// Originating connection
    pub from: ConnectionId,
    /// Destination
    pub target: SignalTarget,
    /// What the payload is
    pub kind: SignalKind,
    /// Opaque payload blob, passed through unexamined
    pub payload: Value,
}

impl SignalingEnvelope {
    /// Offer from a creator to one viewer
    pub fn offer(from: ConnectionId, to: ConnectionId, payload: Value) -> Self {
        Self {
            from,
            target: SignalTarget::Connection(to),
            kind: SignalKind::Offer,
            payload,
        }
    }

    /// Answer from a viewer back to the creator
    pub fn answer(from: ConnectionId, to: ConnectionId, payload: Value) -> Self {
        Self {
            from,
            target: SignalTarget::Connection(to),
            kind: SignalKind::Answer,
            payload,
        }
    }

    /// ICE candidate toward one connection
    pub fn ice_candidate(from: ConnectionId, to: ConnectionId, payload: Value) -> Self {
        Self {
            from,
            target: SignalTarget::Connection(to),
            kind: SignalKind::IceCandidate,
            payload,
        }
    }

    /// Join intent for a stream
    pub fn join(from: ConnectionId, stream: StreamId) -> Self {
        Self {
            from,
            target: SignalTarget::Stream(stream),
            kind: SignalKind::Join,
            payload: Value::Null,
        }
    }

    /// Leave intent for a stream
    pub fn leave(from: ConnectionId, stream: StreamId) -> Self {
        Self {
            from,
            target: SignalTarget::Stream(stream),
            kind: SignalKind::Leave,
            payload: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_display() {
        let id = StreamId::new("live-42");
        assert_eq!(id.to_string(), "live-42");
        assert_eq!(id.as_str(), "live-42");
    }

    #[test]
    fn test_envelope_constructors() {
        let offer = SignalingEnvelope::offer(
            ConnectionId(1),
            ConnectionId(2),
            serde_json::json!({"sdp": "v=0"}),
        );
        assert_eq!(offer.kind, SignalKind::Offer);
        assert_eq!(offer.target, SignalTarget::Connection(ConnectionId(2)));

        let join = SignalingEnvelope::join(ConnectionId(3), StreamId::new("s1"));
        assert_eq!(join.kind, SignalKind::Join);
        assert_eq!(join.target, SignalTarget::Stream(StreamId::new("s1")));
        assert!(join.payload.is_null());
    }
}
