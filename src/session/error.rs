//! Session error types
//!
//! Error types for stream session and routing operations. None of these is
//! fatal: the worst outcome of a malformed event is a rejected operation
//! reported to the originating connection.

use crate::registry::{ConnectionId, Role};
use crate::router::StreamId;

/// Error type for session-table and routing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A live session already exists for the stream id
    AlreadyLive(StreamId),
    /// No live session exists for the stream id
    NoSuchStream(StreamId),
    /// The connection is not part of the stream it claims
    NotAMember {
        connection: ConnectionId,
        stream: StreamId,
    },
    /// The connection's role does not permit the operation
    UnauthorizedRole {
        connection: ConnectionId,
        required: Role,
    },
}

impl SessionError {
    /// Short machine-readable code reported to the originating connection
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::AlreadyLive(_) => "already-live",
            SessionError::NoSuchStream(_) => "no-such-stream",
            SessionError::NotAMember { .. } => "not-a-member",
            SessionError::UnauthorizedRole { .. } => "unauthorized-role",
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::AlreadyLive(stream) => {
                write!(f, "Stream already live: {}", stream)
            }
            SessionError::NoSuchStream(stream) => {
                write!(f, "No live session for stream: {}", stream)
            }
            SessionError::NotAMember { connection, stream } => {
                write!(f, "Connection {} is not a member of stream {}", connection, stream)
            }
            SessionError::UnauthorizedRole { connection, required } => {
                write!(f, "Connection {} requires the {} role", connection, required)
            }
        }
    }
}

impl std::error::Error for SessionError {}
