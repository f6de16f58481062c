//! Signaling route handlers
//!
//! Pure lookup-and-forward logic over [`CoreState`]: no media inspection,
//! no suspension points. A vanished target is a normal outcome (the peer
//! disconnected mid-handshake) and is dropped silently; membership
//! violations are protocol misuse and come back as errors for the
//! originator.

use serde_json::Value;

use crate::presence;
use crate::protocol::ServerEvent;
use crate::registry::{ConnectionId, Role};
use crate::session::SessionError;
use crate::state::CoreState;

use super::envelope::{SignalKind, SignalTarget, SignalingEnvelope, StreamId};

/// What happened to a routed signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the target connection
    Forwarded,
    /// Target was gone or the intent was a duplicate; absorbed
    Dropped,
}

/// Route one envelope to its counterpart connection(s)
pub fn route(
    state: &mut CoreState,
    envelope: SignalingEnvelope,
) -> Result<Delivery, SessionError> {
    match (envelope.kind, envelope.target) {
        (SignalKind::Offer, SignalTarget::Connection(to)) => {
            route_offer(state, envelope.from, to, envelope.payload)
        }
        (SignalKind::Answer, SignalTarget::Connection(to)) => {
            route_answer(state, envelope.from, to, envelope.payload)
        }
        (SignalKind::IceCandidate, SignalTarget::Connection(to)) => {
            route_ice_candidate(state, envelope.from, to, envelope.payload)
        }
        (SignalKind::Join, SignalTarget::Stream(stream)) => {
            handle_join(state, envelope.from, stream).map(|added| {
                if added {
                    Delivery::Forwarded
                } else {
                    Delivery::Dropped
                }
            })
        }
        (SignalKind::Leave, SignalTarget::Stream(stream)) => {
            if handle_leave(state, envelope.from, &stream) {
                Ok(Delivery::Forwarded)
            } else {
                Ok(Delivery::Dropped)
            }
        }
        (kind, target) => {
            tracing::warn!(kind = %kind, ?target, "Envelope kind/target mismatch, dropped");
            Ok(Delivery::Dropped)
        }
    }
}

/// Forward an offer from a creator to one viewer
///
/// Valid only if `from` is the registered creator of the viewer's
/// associated stream. A viewer that disappeared mid-handshake is an
/// expected race, not an error.
pub fn route_offer(
    state: &mut CoreState,
    from: ConnectionId,
    to: ConnectionId,
    payload: Value,
) -> Result<Delivery, SessionError> {
    let Some(viewer) = state.registry.get(to) else {
        tracing::debug!(from = %from, to = %to, "Offer target gone, dropped");
        return Ok(Delivery::Dropped);
    };

    let Some(stream) = viewer.stream.clone() else {
        // Viewer already left the stream; same race as a disconnect
        tracing::debug!(from = %from, to = %to, "Offer target not watching, dropped");
        return Ok(Delivery::Dropped);
    };

    let Some(session) = state.sessions.get(&stream) else {
        tracing::debug!(from = %from, to = %to, stream = %stream, "Offer raced session close, dropped");
        return Ok(Delivery::Dropped);
    };

    if session.creator != from {
        return Err(SessionError::NotAMember {
            connection: from,
            stream,
        });
    }

    state.registry.send_to(to, ServerEvent::Offer { from, payload });
    tracing::trace!(from = %from, to = %to, stream = %stream, "Offer forwarded");
    Ok(Delivery::Forwarded)
}

/// Forward an answer from a viewer back to the creator
///
/// Valid only if `from` is currently a member of the viewer set of the
/// stream `to` is broadcasting.
pub fn route_answer(
    state: &mut CoreState,
    from: ConnectionId,
    to: ConnectionId,
    payload: Value,
) -> Result<Delivery, SessionError> {
    let Some(creator) = state.registry.get(to) else {
        tracing::debug!(from = %from, to = %to, "Answer target gone, dropped");
        return Ok(Delivery::Dropped);
    };

    let Some(stream) = creator.stream.clone() else {
        tracing::debug!(from = %from, to = %to, "Answer target not broadcasting, dropped");
        return Ok(Delivery::Dropped);
    };

    let Some(session) = state.sessions.get(&stream) else {
        tracing::debug!(from = %from, to = %to, stream = %stream, "Answer raced session close, dropped");
        return Ok(Delivery::Dropped);
    };

    if session.creator != to {
        // `to` is a superseded creator connection; the handshake is dead
        tracing::debug!(from = %from, to = %to, stream = %stream, "Answer for stale creator, dropped");
        return Ok(Delivery::Dropped);
    }

    if !session.is_viewer(from) {
        return Err(SessionError::NotAMember {
            connection: from,
            stream,
        });
    }

    state
        .registry
        .send_to(to, ServerEvent::Answer { from, payload });
    tracing::trace!(from = %from, to = %to, stream = %stream, "Answer forwarded");
    Ok(Delivery::Forwarded)
}

/// Forward an ICE candidate
///
/// Forwarded unconditionally to `to` if still registered; dropped
/// otherwise. Candidates trickle in both directions throughout the
/// handshake, so no membership check is applied here.
pub fn route_ice_candidate(
    state: &mut CoreState,
    from: ConnectionId,
    to: ConnectionId,
    payload: Value,
) -> Result<Delivery, SessionError> {
    if state
        .registry
        .send_to(to, ServerEvent::IceCandidate { from, payload })
    {
        tracing::trace!(from = %from, to = %to, "ICE candidate forwarded");
        Ok(Delivery::Forwarded)
    } else {
        tracing::debug!(from = %from, to = %to, "ICE candidate target gone, dropped");
        Ok(Delivery::Dropped)
    }
}

/// Subscribe a viewer to a live stream
///
/// On success the creator is told to initiate its side of the handshake
/// (`viewer-joined`; the offer always flows creator to viewer), the late
/// joiner receives the recent chat history, and the new viewer count is
/// broadcast. Returns `Ok(false)` for a duplicate join.
pub fn handle_join(
    state: &mut CoreState,
    viewer: ConnectionId,
    stream: StreamId,
) -> Result<bool, SessionError> {
    let connection = state
        .registry
        .get(viewer)
        .ok_or_else(|| SessionError::NotAMember {
            connection: viewer,
            stream: stream.clone(),
        })?;

    if connection.role != Role::Viewer {
        return Err(SessionError::UnauthorizedRole {
            connection: viewer,
            required: Role::Viewer,
        });
    }

    // Joining a second stream implicitly leaves the first, so the single
    // stream back-reference stays truthful.
    if let Some(previous) = connection.stream.clone() {
        if previous != stream {
            handle_leave(state, viewer, &previous);
        }
    }

    let added = state.sessions.add_viewer(&stream, viewer)?;
    if !added {
        tracing::debug!(stream = %stream, connection = %viewer, "Duplicate join ignored");
        return Ok(false);
    }

    state.registry.bind_stream(viewer, stream.clone());

    if let Some(session) = state.sessions.get(&stream) {
        state.registry.send_to(
            session.creator,
            ServerEvent::ViewerJoined {
                stream_id: stream.clone(),
                viewer_connection_id: viewer,
            },
        );

        if !session.history.is_empty() {
            state.registry.send_to(
                viewer,
                ServerEvent::ChatHistory {
                    stream_id: stream.clone(),
                    events: session.history.snapshot(),
                },
            );
        }

        presence::broadcast_viewer_count(&state.registry, session);
    }

    tracing::info!(stream = %stream, connection = %viewer, "Viewer joined");
    Ok(true)
}

/// Remove a viewer from a stream
///
/// Idempotent: leaving a stream the viewer never joined (or already left)
/// is a no-op, which absorbs duplicate leave and disconnect events.
/// Returns whether the viewer was actually removed.
pub fn handle_leave(state: &mut CoreState, viewer: ConnectionId, stream: &StreamId) -> bool {
    let removed = state.sessions.remove_viewer(stream, viewer);

    if removed {
        let still_bound = state
            .registry
            .get(viewer)
            .map(|c| c.stream.as_ref() == Some(stream))
            .unwrap_or(false);
        if still_bound {
            state.registry.clear_stream(viewer);
        }

        if let Some(session) = state.sessions.get(stream) {
            presence::broadcast_viewer_count(&state.registry, session);
        }

        tracing::info!(stream = %stream, connection = %viewer, "Viewer left");
    } else {
        tracing::debug!(stream = %stream, connection = %viewer, "Leave for non-member ignored");
    }

    removed
}
