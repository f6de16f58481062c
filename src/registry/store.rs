//! Connection registry implementation
//!
//! The registry is the exclusive owner of every live `Connection`.
//! Registration never fails; unregistration is idempotent, which guards
//! against duplicate disconnect events from the transport layer.

use std::collections::HashMap;

use crate::protocol::ServerEvent;
use crate::router::StreamId;

use super::connection::{Connection, ConnectionId, Identity, OutboundSink, Role};

/// Registry of every live transport connection
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Map of connection id to connection
    connections: HashMap<ConnectionId, Connection>,

    /// Next connection id to allocate
    next_id: u64,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a new connection with no stream association
    pub fn register(&mut self, identity: Identity, role: Role, sink: OutboundSink) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        self.connections
            .insert(id, Connection::new(id, identity, role, sink));

        tracing::debug!(connection = %id, "Connection registered");
        id
    }

    /// Look up a connection
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Look up a connection mutably
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Check whether a connection is still registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Remove a connection; `None` if it was already unregistered
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(&id);
        if removed.is_some() {
            tracing::debug!(connection = %id, "Connection unregistered");
        }
        removed
    }

    /// Set the stream back-reference of a connection
    pub fn bind_stream(&mut self, id: ConnectionId, stream: StreamId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.stream = Some(stream);
        }
    }

    /// Clear the stream back-reference of a connection
    pub fn clear_stream(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.stream = None;
        }
    }

    /// Queue an event for a connection if it is still registered
    ///
    /// Returns false when the target is gone; the caller decides whether
    /// that is a race to absorb or misuse to reject.
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&id) {
            Some(connection) => {
                connection.send(event);
                true
            }
            None => false,
        }
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_one(registry: &mut ConnectionRegistry, name: &str, role: Role) -> ConnectionId {
        let (sink, _rx) = OutboundSink::channel();
        registry.register(Identity::User(name.into()), role, sink)
    }

    #[test]
    fn test_register_assigns_unique_ids() {
        let mut registry = ConnectionRegistry::new();

        let a = register_one(&mut registry, "a", Role::Creator);
        let b = register_one(&mut registry, "b", Role::Viewer);

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(a).is_some());
        assert!(registry.get(b).is_some());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let id = register_one(&mut registry, "a", Role::Viewer);

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bind_and_clear_stream() {
        let mut registry = ConnectionRegistry::new();
        let id = register_one(&mut registry, "a", Role::Viewer);

        registry.bind_stream(id, StreamId::new("s1"));
        assert_eq!(
            registry.get(id).and_then(|c| c.stream.clone()),
            Some(StreamId::new("s1"))
        );

        registry.clear_stream(id);
        assert_eq!(registry.get(id).and_then(|c| c.stream.clone()), None);

        // Binding an unregistered id is a no-op
        registry.bind_stream(ConnectionId(999), StreamId::new("s1"));
    }

    #[test]
    fn test_send_to_unregistered_returns_false() {
        let registry = ConnectionRegistry::new();

        assert!(!registry.send_to(
            ConnectionId(1),
            ServerEvent::StreamEnded {
                stream_id: StreamId::new("s1"),
            }
        ));
    }
}
