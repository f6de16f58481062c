//! Stream session table implementation
//!
//! The central table of every currently-live stream. Membership mutations
//! here are single indivisible steps: callers broadcast the resulting
//! viewer count while still holding the same state lock, so no torn count
//! is ever observable.

use std::collections::HashMap;

use crate::registry::{ConnectionId, Identity};
use crate::router::StreamId;

use super::entry::StreamSession;
use super::error::SessionError;

/// Table of every currently-live stream session
#[derive(Debug)]
pub struct SessionTable {
    /// Map of stream id to live session
    sessions: HashMap<StreamId, StreamSession>,

    /// Chat history capacity for newly opened sessions
    history_capacity: usize,
}

impl SessionTable {
    /// Create an empty table
    pub fn new(history_capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            history_capacity,
        }
    }

    /// Open a session for a stream going live
    ///
    /// Fails with `AlreadyLive` if a session for the stream id exists,
    /// preventing two concurrent broadcasts under the same id. Restart
    /// policy (auto-closing a stale session) is decided one level up in
    /// [`CoreState`](crate::state::CoreState), which can see the registry.
    pub fn open_session(
        &mut self,
        stream: StreamId,
        creator: ConnectionId,
        creator_identity: Identity,
    ) -> Result<(), SessionError> {
        if self.sessions.contains_key(&stream) {
            return Err(SessionError::AlreadyLive(stream));
        }

        tracing::info!(stream = %stream, connection = %creator, "Session opened");
        self.sessions.insert(
            stream.clone(),
            StreamSession::new(stream, creator, creator_identity, self.history_capacity),
        );
        Ok(())
    }

    /// Remove a session, returning it for viewer notification
    ///
    /// The caller notifies the evicted viewers and clears their stream
    /// associations; their connections themselves stay registered.
    pub fn close_session(&mut self, stream: &StreamId) -> Option<StreamSession> {
        let removed = self.sessions.remove(stream);
        if removed.is_some() {
            tracing::info!(stream = %stream, "Session closed");
        }
        removed
    }

    /// Add a viewer to a live session
    ///
    /// `NoSuchStream` covers the race where a join arrives after the
    /// stream already stopped. Returns `Ok(false)` when the viewer was
    /// already a member (set semantics).
    pub fn add_viewer(
        &mut self,
        stream: &StreamId,
        viewer: ConnectionId,
    ) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(stream)
            .ok_or_else(|| SessionError::NoSuchStream(stream.clone()))?;

        let added = session.add_viewer(viewer);
        if added {
            tracing::debug!(
                stream = %stream,
                connection = %viewer,
                viewers = session.viewer_count(),
                "Viewer added"
            );
        }
        Ok(added)
    }

    /// Remove a viewer; no-op when absent or the stream is not live
    ///
    /// Idempotent under duplicate leave and disconnect events. Returns
    /// whether the viewer was actually removed.
    pub fn remove_viewer(&mut self, stream: &StreamId, viewer: ConnectionId) -> bool {
        match self.sessions.get_mut(stream) {
            Some(session) => {
                let removed = session.remove_viewer(viewer);
                if removed {
                    tracing::debug!(
                        stream = %stream,
                        connection = %viewer,
                        viewers = session.viewer_count(),
                        "Viewer removed"
                    );
                }
                removed
            }
            None => false,
        }
    }

    /// Look up a live session
    pub fn get(&self, stream: &StreamId) -> Option<&StreamSession> {
        self.sessions.get(stream)
    }

    /// Look up a live session mutably
    pub fn get_mut(&mut self, stream: &StreamId) -> Option<&mut StreamSession> {
        self.sessions.get_mut(stream)
    }

    /// Check whether a stream is live
    pub fn is_live(&self, stream: &StreamId) -> bool {
        self.sessions.contains_key(stream)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no sessions are live
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterate the live sessions (arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = &StreamSession> {
        self.sessions.values()
    }
}
