//! Hub statistics
//!
//! Cheap monotonic counters maintained by the hub, readable at any time
//! without taking the state lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for hub activity
#[derive(Debug, Default)]
pub struct HubStats {
    /// Connections registered
    pub connections_opened: AtomicU64,
    /// Connections torn down
    pub connections_closed: AtomicU64,
    /// Stream sessions opened
    pub sessions_opened: AtomicU64,
    /// Stream sessions closed (stop, restart or disconnect)
    pub sessions_closed: AtomicU64,
    /// Successful viewer joins
    pub viewers_joined: AtomicU64,
    /// Viewer departures (leave or disconnect)
    pub viewers_left: AtomicU64,
    /// Signaling messages forwarded to their target
    pub signals_forwarded: AtomicU64,
    /// Signaling messages dropped because the target was gone
    pub signals_dropped: AtomicU64,
    /// Chat messages fanned out
    pub chat_messages: AtomicU64,
    /// Tips fanned out
    pub tips: AtomicU64,
    /// Inbound events rejected and reported to their originator
    pub events_rejected: AtomicU64,
}

impl HubStats {
    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            viewers_joined: self.viewers_joined.load(Ordering::Relaxed),
            viewers_left: self.viewers_left.load(Ordering::Relaxed),
            signals_forwarded: self.signals_forwarded.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            chat_messages: self.chat_messages.load(Ordering::Relaxed),
            tips: self.tips.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the hub counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub viewers_joined: u64,
    pub viewers_left: u64,
    pub signals_forwarded: u64,
    pub signals_dropped: u64,
    pub chat_messages: u64,
    pub tips: u64,
    pub events_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_increments() {
        let stats = HubStats::default();

        stats.connections_opened.fetch_add(2, Ordering::Relaxed);
        stats.signals_forwarded.fetch_add(5, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections_opened, 2);
        assert_eq!(snapshot.signals_forwarded, 5);
        assert_eq!(snapshot.tips, 0);
    }
}
