//! Stream session state
//!
//! This module defines the per-stream record stored in the session table.

use std::collections::HashSet;
use std::time::Instant;

use crate::registry::{ConnectionId, Identity};
use crate::router::StreamId;
use crate::transport::ChannelGrant;

use super::history::ChatHistory;

/// Live state for one currently-broadcasting stream
///
/// Exists if and only if the creator connection is registered and has not
/// stopped the stream. The session exclusively owns its viewer set and
/// chat history; the viewer count is kept in lockstep with the set and
/// can never be observed diverging from it.
#[derive(Debug)]
pub struct StreamSession {
    /// Stream id
    pub stream: StreamId,

    /// Creator's connection id (exactly one per session)
    pub creator: ConnectionId,

    /// Creator's identity, kept for the restart policy
    pub creator_identity: Identity,

    /// Connections currently watching, unique by connection id
    viewers: HashSet<ConnectionId>,

    /// Live viewer count; always equals `viewers.len()`
    viewer_count: u32,

    /// Bounded chat/tip history, newest last
    pub history: ChatHistory,

    /// Credential returned by the transport collaborator, if any
    pub grant: Option<ChannelGrant>,

    /// When the session opened
    pub opened_at: Instant,
}

impl StreamSession {
    pub(super) fn new(
        stream: StreamId,
        creator: ConnectionId,
        creator_identity: Identity,
        history_capacity: usize,
    ) -> Self {
        Self {
            stream,
            creator,
            creator_identity,
            viewers: HashSet::new(),
            viewer_count: 0,
            history: ChatHistory::with_capacity(history_capacity),
            grant: None,
            opened_at: Instant::now(),
        }
    }

    /// Add a viewer; returns false if already present (set semantics)
    pub fn add_viewer(&mut self, id: ConnectionId) -> bool {
        let added = self.viewers.insert(id);
        if added {
            self.viewer_count += 1;
        }
        debug_assert_eq!(self.viewer_count as usize, self.viewers.len());
        added
    }

    /// Remove a viewer; returns false if not present
    pub fn remove_viewer(&mut self, id: ConnectionId) -> bool {
        let removed = self.viewers.remove(&id);
        if removed {
            self.viewer_count -= 1;
        }
        debug_assert_eq!(self.viewer_count as usize, self.viewers.len());
        removed
    }

    /// Current authoritative viewer count
    pub fn viewer_count(&self) -> u32 {
        self.viewer_count
    }

    /// Check whether a connection is a member viewer
    pub fn is_viewer(&self, id: ConnectionId) -> bool {
        self.viewers.contains(&id)
    }

    /// Check whether a connection is the creator or a member viewer
    pub fn is_member(&self, id: ConnectionId) -> bool {
        id == self.creator || self.viewers.contains(&id)
    }

    /// Iterate the viewer ids (arbitrary order)
    pub fn viewers(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.viewers.iter().copied()
    }

    /// Snapshot of the viewer ids
    pub fn viewer_ids(&self) -> Vec<ConnectionId> {
        self.viewers.iter().copied().collect()
    }

    /// Session duration so far
    pub fn duration(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> StreamSession {
        StreamSession::new(
            StreamId::new("s1"),
            ConnectionId(1),
            Identity::User("cora".into()),
            8,
        )
    }

    #[test]
    fn test_add_remove_keeps_count_in_lockstep() {
        let mut session = make_session();
        assert_eq!(session.viewer_count(), 0);

        assert!(session.add_viewer(ConnectionId(2)));
        assert!(session.add_viewer(ConnectionId(3)));
        assert_eq!(session.viewer_count(), 2);

        // Re-add is a no-op, not a double-count
        assert!(!session.add_viewer(ConnectionId(2)));
        assert_eq!(session.viewer_count(), 2);

        assert!(session.remove_viewer(ConnectionId(2)));
        assert_eq!(session.viewer_count(), 1);

        // Removing a non-member never goes negative
        assert!(!session.remove_viewer(ConnectionId(2)));
        assert!(!session.remove_viewer(ConnectionId(99)));
        assert_eq!(session.viewer_count(), 1);
    }

    #[test]
    fn test_membership_includes_creator() {
        let mut session = make_session();
        session.add_viewer(ConnectionId(2));

        assert!(session.is_member(ConnectionId(1)));
        assert!(session.is_member(ConnectionId(2)));
        assert!(!session.is_viewer(ConnectionId(1)));
        assert!(!session.is_member(ConnectionId(3)));
    }
}
