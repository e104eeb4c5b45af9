//! Bounded outbound queue for messages sent while disconnected.

use std::collections::VecDeque;

use serde_json::Value;

/// Outcome of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the open socket.
    Sent,
    /// Held until the next successful open.
    Queued,
    /// Rejected: queue full or message unserializable.
    Dropped,
}

impl SendOutcome {
    /// Whether the message will reach the server (now or after reconnect).
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Sent | Self::Queued)
    }
}

/// FIFO of pending outbound messages.
///
/// When full, new messages are refused; already queued ones are never evicted.
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<Value>,
    capacity: usize,
}

impl OutboundQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `message` unless the queue is full.
    pub fn push(&mut self, message: Value) -> bool {
        if self.messages.len() >= self.capacity {
            return false;
        }
        self.messages.push_back(message);
        true
    }

    /// Take every queued message in FIFO order, leaving the queue empty.
    pub fn take_all(&mut self) -> VecDeque<Value> {
        std::mem::take(&mut self.messages)
    }

    /// Discard everything without sending.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
