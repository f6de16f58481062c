//! Shared coordinator state
//!
//! All mutable signaling state lives in one explicitly-owned [`CoreState`]
//! that is passed by reference into every event handler; there are no
//! ambient globals, so the whole coordinator can be unit tested without a
//! live transport. The hub wraps it in a single write lock: every
//! transition below is one indivisible step from the point of view of
//! other connections.
//!
//! The operations here are the ones that must stay consistent across both
//! structures at once: going live, stopping, and the disconnect cleanup
//! that may do a bit of everything.

use crate::registry::{ConnectionId, ConnectionRegistry, Role};
use crate::router::StreamId;
use crate::session::{SessionError, SessionTable};
use crate::transport::ChannelGrant;

/// The two shared mutable structures of the signaling core
#[derive(Debug)]
pub struct CoreState {
    /// Every live transport connection
    pub registry: ConnectionRegistry,

    /// Every currently-live stream
    pub sessions: SessionTable,
}

/// What a closed session leaves behind for the caller to act on
#[derive(Debug)]
pub struct ClosedSession {
    /// The stream that ended
    pub stream: StreamId,

    /// Viewers that were members when the session closed
    ///
    /// Their stream associations are already cleared; the connections
    /// themselves stay registered.
    pub viewers: Vec<ConnectionId>,

    /// Transport credential to revoke, if one was granted
    pub grant: Option<ChannelGrant>,
}

/// Result of a successful `start_stream`
#[derive(Debug)]
pub struct StartedStream {
    /// The stream that went live
    pub stream: StreamId,

    /// Stale session auto-closed by the restart policy, if any
    pub replaced: Option<ClosedSession>,
}

/// Everything one disconnect cleaned up
#[derive(Debug, Default)]
pub struct DisconnectCleanup {
    /// Role of the removed connection; `None` for a duplicate disconnect
    pub removed: Option<Role>,

    /// Stream the connection was watching and has now left, still live
    pub left_stream: Option<StreamId>,

    /// Session closed because the disconnecting connection was its creator
    pub closed_session: Option<ClosedSession>,
}

impl CoreState {
    /// Create empty state with the given chat history capacity
    pub fn new(history_capacity: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            sessions: SessionTable::new(history_capacity),
        }
    }

    /// Open a live session for `stream`, owned by connection `conn`
    ///
    /// Only creator-role connections may go live. A second start for the
    /// same stream from the *same* connection is `AlreadyLive`; a start
    /// from a new connection of the same creator identity, or over a
    /// session whose creator connection is no longer registered, auto-
    /// closes the stale session first (crash without a clean stop). A
    /// different live creator is `AlreadyLive`.
    pub fn start_stream(
        &mut self,
        conn: ConnectionId,
        stream: StreamId,
    ) -> Result<StartedStream, SessionError> {
        let connection = self
            .registry
            .get(conn)
            .ok_or_else(|| SessionError::NotAMember {
                connection: conn,
                stream: stream.clone(),
            })?;

        if connection.role != Role::Creator {
            return Err(SessionError::UnauthorizedRole {
                connection: conn,
                required: Role::Creator,
            });
        }
        let identity = connection.identity.clone();

        let replaced = match self.sessions.get(&stream) {
            Some(existing) => {
                let stale = !self.registry.contains(existing.creator);
                let restart =
                    existing.creator != conn && existing.creator_identity == identity;

                if existing.creator == conn || (!stale && !restart) {
                    return Err(SessionError::AlreadyLive(stream));
                }

                tracing::info!(
                    stream = %stream,
                    old = %existing.creator,
                    new = %conn,
                    "Auto-closing stale session on restart"
                );
                self.close_session(&stream)
            }
            None => None,
        };

        self.sessions.open_session(stream.clone(), conn, identity)?;
        self.registry.bind_stream(conn, stream.clone());

        Ok(StartedStream { stream, replaced })
    }

    /// Stop a live stream; only its owning creator connection may
    pub fn stop_stream(
        &mut self,
        conn: ConnectionId,
        stream: StreamId,
    ) -> Result<ClosedSession, SessionError> {
        let session = self
            .sessions
            .get(&stream)
            .ok_or_else(|| SessionError::NoSuchStream(stream.clone()))?;

        if session.creator != conn {
            // Mirror of the publisher-mismatch guard: a stop from anyone
            // but the owning connection must not tear the session down.
            tracing::warn!(
                stream = %stream,
                expected = %session.creator,
                actual = %conn,
                "Stop from non-owner rejected"
            );
            if self.registry.get(conn).map(|c| c.role) == Some(Role::Viewer) {
                return Err(SessionError::UnauthorizedRole {
                    connection: conn,
                    required: Role::Creator,
                });
            }
            return Err(SessionError::NotAMember {
                connection: conn,
                stream,
            });
        }

        match self.close_session(&stream) {
            Some(closed) => Ok(closed),
            None => Err(SessionError::NoSuchStream(stream)),
        }
    }

    /// Remove a session and clear every member's stream association
    ///
    /// Viewer notification is the caller's job (it knows whether this is a
    /// stop, a restart, or a disconnect); the returned `ClosedSession`
    /// carries what it needs.
    pub fn close_session(&mut self, stream: &StreamId) -> Option<ClosedSession> {
        let session = self.sessions.close_session(stream)?;

        let viewers = session.viewer_ids();
        for viewer in &viewers {
            self.registry.clear_stream(*viewer);
        }

        let creator_bound = self
            .registry
            .get(session.creator)
            .map(|c| c.stream.as_ref() == Some(stream))
            .unwrap_or(false);
        if creator_bound {
            self.registry.clear_stream(session.creator);
        }

        Some(ClosedSession {
            stream: session.stream.clone(),
            viewers,
            grant: session.grant,
        })
    }

    /// Tear down a connection and everything that depended on it
    ///
    /// The only cancellation signal in the core: it must leave no trace of
    /// the connection regardless of what handshake phase was in progress.
    /// Idempotent under duplicate disconnect events.
    pub fn disconnect(&mut self, conn: ConnectionId) -> DisconnectCleanup {
        let Some(connection) = self.registry.unregister(conn) else {
            tracing::debug!(connection = %conn, "Duplicate disconnect ignored");
            return DisconnectCleanup::default();
        };

        let mut cleanup = DisconnectCleanup {
            removed: Some(connection.role),
            ..DisconnectCleanup::default()
        };

        if let Some(stream) = connection.stream {
            match connection.role {
                Role::Viewer => {
                    if self.sessions.remove_viewer(&stream, conn) {
                        cleanup.left_stream = Some(stream);
                    }
                }
                Role::Creator => {
                    // Close only if this connection still owns the session;
                    // a restart may already have superseded it.
                    let owns = self
                        .sessions
                        .get(&stream)
                        .map(|s| s.creator == conn)
                        .unwrap_or(false);
                    if owns {
                        cleanup.closed_session = self.close_session(&stream);
                    }
                }
            }
        }

        cleanup
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::{Identity, OutboundSink};

    use super::*;

    fn add_connection(state: &mut CoreState, name: &str, role: Role) -> ConnectionId {
        let (sink, _rx) = OutboundSink::channel();
        state.registry.register(Identity::User(name.into()), role, sink)
    }

    #[test]
    fn test_start_stream_requires_creator_role() {
        let mut state = CoreState::new(8);
        let viewer = add_connection(&mut state, "vic", Role::Viewer);

        let result = state.start_stream(viewer, StreamId::new("s1"));
        assert!(matches!(
            result,
            Err(SessionError::UnauthorizedRole { required: Role::Creator, .. })
        ));
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn test_same_connection_cannot_restart_its_own_live_stream() {
        let mut state = CoreState::new(8);
        let creator = add_connection(&mut state, "cora", Role::Creator);

        state.start_stream(creator, StreamId::new("s1")).expect("start");
        let result = state.start_stream(creator, StreamId::new("s1"));

        assert_eq!(
            result.map(|_| ()),
            Err(SessionError::AlreadyLive(StreamId::new("s1")))
        );
    }

    #[test]
    fn test_restart_from_new_connection_auto_closes_stale_session() {
        let mut state = CoreState::new(8);
        let old = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(old, StreamId::new("s1")).expect("start");

        let viewer = add_connection(&mut state, "vic", Role::Viewer);
        state.sessions.add_viewer(&StreamId::new("s1"), viewer).unwrap();
        state.registry.bind_stream(viewer, StreamId::new("s1"));

        // Same identity reconnects on a fresh socket and goes live again
        let new = add_connection(&mut state, "cora", Role::Creator);
        let started = state.start_stream(new, StreamId::new("s1")).expect("restart");

        let replaced = started.replaced.expect("stale session closed");
        assert_eq!(replaced.viewers, vec![viewer]);
        assert_eq!(state.sessions.get(&StreamId::new("s1")).unwrap().creator, new);
        // Evicted viewer association cleared, connection still registered
        assert_eq!(state.registry.get(viewer).unwrap().stream, None);
    }

    #[test]
    fn test_different_creator_cannot_take_over_live_stream() {
        let mut state = CoreState::new(8);
        let cora = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(cora, StreamId::new("s1")).expect("start");

        let dora = add_connection(&mut state, "dora", Role::Creator);
        let result = state.start_stream(dora, StreamId::new("s1"));

        assert_eq!(
            result.map(|_| ()),
            Err(SessionError::AlreadyLive(StreamId::new("s1")))
        );
        assert_eq!(state.sessions.get(&StreamId::new("s1")).unwrap().creator, cora);
    }

    #[test]
    fn test_stop_from_non_owner_is_rejected() {
        let mut state = CoreState::new(8);
        let cora = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(cora, StreamId::new("s1")).expect("start");

        let vic = add_connection(&mut state, "vic", Role::Viewer);
        let result = state.stop_stream(vic, StreamId::new("s1"));
        assert!(matches!(result, Err(SessionError::UnauthorizedRole { .. })));

        let dora = add_connection(&mut state, "dora", Role::Creator);
        let result = state.stop_stream(dora, StreamId::new("s1"));
        assert!(matches!(result, Err(SessionError::NotAMember { .. })));

        assert!(state.sessions.is_live(&StreamId::new("s1")));
    }

    #[test]
    fn test_creator_disconnect_closes_session_and_keeps_viewers_registered() {
        let mut state = CoreState::new(8);
        let creator = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let v1 = add_connection(&mut state, "v1", Role::Viewer);
        let v2 = add_connection(&mut state, "v2", Role::Viewer);
        for v in [v1, v2] {
            state.sessions.add_viewer(&StreamId::new("s1"), v).unwrap();
            state.registry.bind_stream(v, StreamId::new("s1"));
        }

        let cleanup = state.disconnect(creator);
        let closed = cleanup.closed_session.expect("session closed");
        assert_eq!(closed.stream, StreamId::new("s1"));
        assert_eq!(closed.viewers.len(), 2);

        assert!(!state.sessions.is_live(&StreamId::new("s1")));
        for v in [v1, v2] {
            assert!(state.registry.contains(v));
            assert_eq!(state.registry.get(v).unwrap().stream, None);
        }
    }

    #[test]
    fn test_viewer_disconnect_corrects_count() {
        let mut state = CoreState::new(8);
        let creator = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let viewer = add_connection(&mut state, "vic", Role::Viewer);
        state.sessions.add_viewer(&StreamId::new("s1"), viewer).unwrap();
        state.registry.bind_stream(viewer, StreamId::new("s1"));

        let cleanup = state.disconnect(viewer);
        assert_eq!(cleanup.left_stream, Some(StreamId::new("s1")));
        assert_eq!(
            state.sessions.get(&StreamId::new("s1")).unwrap().viewer_count(),
            0
        );
    }

    #[test]
    fn test_duplicate_disconnect_is_noop() {
        let mut state = CoreState::new(8);
        let conn = add_connection(&mut state, "vic", Role::Viewer);

        assert!(state.disconnect(conn).removed.is_some());
        let second = state.disconnect(conn);
        assert!(second.removed.is_none());
        assert!(second.left_stream.is_none());
        assert!(second.closed_session.is_none());
    }
}
