//! Crate-level error types

use thiserror::Error;

use crate::session::SessionError;

/// Errors surfaced by the signaling server front-end
///
/// Domain errors ([`SessionError`]) are handled per the propagation
/// policy and rarely reach this level; the variants here are the
/// transport-facing failures of the WebSocket front-end.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the listener or a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed JSON frame
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Domain error from the signaling core
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;
