use std::collections::VecDeque;

use tracing::warn;

use super::OmniLinkEvent;

/// Bounded FIFO of pending webhook events. Overflow drops the oldest.
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<OmniLinkEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append an event, evicting the oldest when full.
    pub fn push(&mut self, event: OmniLinkEvent) {
        if self.events.len() == self.capacity {
            if let Some(evicted) = self.events.pop_front() {
                self.dropped += 1;
                warn!(
                    event_id = %evicted.id,
                    kind = %evicted.kind,
                    dropped = self.dropped,
                    "OmniLink queue full, dropping oldest event"
                );
            }
        }
        self.events.push_back(event);
    }

    /// Put an event back at the head after a failed delivery.
    ///
    /// If newer events filled the queue meanwhile, the newest is evicted.
    pub fn requeue_front(&mut self, event: OmniLinkEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_back();
            self.dropped += 1;
        }
        self.events.push_front(event);
    }

    /// Take the oldest event.
    pub fn pop(&mut self) -> Option<OmniLinkEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events evicted since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
