//! Acknowledgement batching.
//!
//! Progress is acknowledged at most once per flush interval; the manager
//! arms the flush timer, this type decides what, if anything, to send.

/// Tracks the last acknowledged sequence.
#[derive(Debug, Default)]
pub struct AckBatcher {
    last_acked: u64,
}

impl AckBatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self { last_acked: 0 }
    }

    #[must_use]
    pub const fn last_acked(&self) -> u64 {
        self.last_acked
    }

    /// Whether `last_contiguous` is ahead of what was acknowledged.
    #[must_use]
    pub const fn is_behind(&self, last_contiguous: u64) -> bool {
        last_contiguous != self.last_acked
    }

    /// An ack for `ack_seq` went out.
    pub const fn record(&mut self, ack_seq: u64) {
        self.last_acked = ack_seq;
    }

    /// Keep the ack position at or below the delivered position.
    pub fn clamp(&mut self, last_contiguous: u64) {
        self.last_acked = self.last_acked.min(last_contiguous);
    }

    /// Restart acknowledgement at `anchor`.
    pub const fn reset(&mut self, anchor: u64) {
        self.last_acked = anchor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behind_until_recorded() {
        let mut acks = AckBatcher::new();
        assert!(!acks.is_behind(0));

        assert!(acks.is_behind(5));
        acks.record(5);
        assert!(!acks.is_behind(5));
        assert_eq!(acks.last_acked(), 5);
    }

    #[test]
    fn test_clamp_after_server_rewind() {
        let mut acks = AckBatcher::new();
        acks.record(20);
        acks.clamp(12);
        assert_eq!(acks.last_acked(), 12);
        acks.clamp(30);
        assert_eq!(acks.last_acked(), 12);
    }
}
