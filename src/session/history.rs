//! Bounded chat history for late-joiner support
//!
//! Each live session keeps its most recent chat and tip events so a viewer
//! joining mid-stream can be brought up to date. The buffer is bounded: at
//! capacity the oldest entry is evicted, newest stays last.

use std::collections::VecDeque;

use crate::chat::ChatEvent;

/// Bounded ring of the most recent chat events for one stream
#[derive(Debug)]
pub struct ChatHistory {
    /// Maximum number of retained events
    capacity: usize,
    /// Retained events, oldest first
    entries: VecDeque<ChatEvent>,
}

impl ChatHistory {
    /// Create a history retaining at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an event, evicting (and returning) the oldest at capacity
    pub fn push(&mut self, event: ChatEvent) -> Option<ChatEvent> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        self.entries.push_back(event);
        evicted
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no events are retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent event
    pub fn latest(&self) -> Option<&ChatEvent> {
        self.entries.back()
    }

    /// All retained events, oldest first, for late-joiner catch-up
    pub fn snapshot(&self) -> Vec<ChatEvent> {
        self.entries.iter().cloned().collect()
    }
}
