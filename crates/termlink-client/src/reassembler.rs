//! Sequence reassembly of terminal output.
//!
//! Chunks leave the reassembler in strictly increasing, gapless sequence
//! order, each sequence number at most once. Out-of-order arrivals wait in
//! an ordered buffer until the gap before them closes.

use std::collections::BTreeMap;

use termlink_protocol::{ChunkBatch, TerminalChunk};

/// Why local stream state has to be rebuilt from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// Too many out-of-order chunks buffered.
    PendingOverflow,
    /// A batch straddles the delivered position and cannot be split.
    OverlappingBatch,
    /// A gap stayed open for a whole gap timeout without progress.
    GapTimeout,
    /// The server discarded history we had not consumed.
    ServerOverflow,
    /// The host asked for it.
    Requested,
}

/// Result of feeding one chunk or batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Already delivered; nothing changed.
    Duplicate,
    /// Payloads to hand to the consumer, in order.
    Delivered(Vec<String>),
    /// Payloads to deliver, after which local state must be rebuilt.
    DeliveredThenResync(Vec<String>, ResyncReason),
    /// Held back behind a gap. `opened_gap` is set for the first buffered entry.
    Buffered { opened_gap: bool },
    /// Local state can no longer converge.
    ResyncNeeded(ResyncReason),
}

/// Progress check when the gap timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapCheck {
    /// No gap is open any more.
    Closed,
    /// A gap is open but the stream advanced since the timer was armed.
    Progressed,
    /// The stream is stuck behind the gap.
    Stalled,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    count: u64,
    data: String,
}

/// Orders incoming chunks by sequence number.
#[derive(Debug)]
pub struct SequenceReassembler {
    last_contiguous: u64,
    /// Keyed by first sequence; every key is greater than `last_contiguous`.
    pending: BTreeMap<u64, PendingEntry>,
    max_pending: usize,
    /// `last_contiguous` when the gap timer was armed.
    gap_marker: Option<u64>,
}

impl SequenceReassembler {
    #[must_use]
    pub const fn new(max_pending: usize) -> Self {
        Self {
            last_contiguous: 0,
            pending: BTreeMap::new(),
            max_pending,
            gap_marker: None,
        }
    }

    #[must_use]
    pub const fn last_contiguous(&self) -> u64 {
        self.last_contiguous
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest buffered sequence number.
    #[must_use]
    pub fn earliest_pending(&self) -> Option<u64> {
        self.pending.keys().next().copied()
    }

    /// Whether buffered data is waiting behind a missing sequence.
    #[must_use]
    pub fn gap_open(&self) -> bool {
        self.earliest_pending()
            .is_some_and(|earliest| self.last_contiguous < earliest - 1)
    }

    /// Feed a single chunk.
    pub fn on_chunk(&mut self, chunk: TerminalChunk) -> ChunkOutcome {
        self.accept(chunk.seq, 1, chunk.data)
    }

    /// Feed a batch of consecutive chunks.
    pub fn on_batch(&mut self, batch: ChunkBatch) -> ChunkOutcome {
        if batch.chunk_count == 0 {
            return ChunkOutcome::Duplicate;
        }
        self.accept(batch.start_seq, batch.chunk_count, batch.data)
    }

    fn accept(&mut self, start: u64, count: u64, data: String) -> ChunkOutcome {
        let end = last_seq(start, count);
        if end <= self.last_contiguous {
            return ChunkOutcome::Duplicate;
        }
        if start <= self.last_contiguous {
            tracing::warn!(
                start,
                end,
                last_contiguous = self.last_contiguous,
                "Batch overlaps delivered output"
            );
            return ChunkOutcome::ResyncNeeded(ResyncReason::OverlappingBatch);
        }

        if start == self.last_contiguous + 1 {
            let mut delivered = vec![data];
            self.last_contiguous = end;
            return match self.drain_into(&mut delivered) {
                Some(reason) => ChunkOutcome::DeliveredThenResync(delivered, reason),
                None => ChunkOutcome::Delivered(delivered),
            };
        }

        if self.pending.contains_key(&start) {
            return ChunkOutcome::Duplicate;
        }
        let opened_gap = self.pending.is_empty();
        self.pending.insert(start, PendingEntry { count, data });
        tracing::debug!(
            seq = start,
            last_contiguous = self.last_contiguous,
            pending = self.pending.len(),
            "Buffered out-of-order chunk"
        );

        if self.pending.len() > self.max_pending {
            self.pending.clear();
            self.gap_marker = None;
            return ChunkOutcome::ResyncNeeded(ResyncReason::PendingOverflow);
        }
        ChunkOutcome::Buffered { opened_gap }
    }

    /// Pop buffered entries that became contiguous.
    ///
    /// Stops at a buffered batch that straddles the delivered position and
    /// reports it, since that batch cannot be split.
    fn drain_into(&mut self, delivered: &mut Vec<String>) -> Option<ResyncReason> {
        while let Some(entry) = self.pending.first_entry() {
            let start = *entry.key();
            if start > self.last_contiguous + 1 {
                break;
            }
            let PendingEntry { count, data } = entry.remove();
            let end = last_seq(start, count);
            if start <= self.last_contiguous {
                if end > self.last_contiguous {
                    tracing::warn!(
                        start,
                        end,
                        last_contiguous = self.last_contiguous,
                        "Buffered batch overlaps delivered output"
                    );
                    return Some(ResyncReason::OverlappingBatch);
                }
                continue;
            }
            delivered.push(data);
            self.last_contiguous = end;
        }
        None
    }

    /// Remember the current position when the gap timer is armed.
    pub fn mark_gap(&mut self) {
        self.gap_marker = Some(self.last_contiguous);
    }

    /// Evaluate an elapsed gap timer.
    pub fn check_gap(&mut self) -> GapCheck {
        let marker = self.gap_marker.take();
        if !self.gap_open() {
            return GapCheck::Closed;
        }
        match marker {
            Some(marker) if marker == self.last_contiguous => GapCheck::Stalled,
            _ => GapCheck::Progressed,
        }
    }

    /// Adopt the server's resync point.
    ///
    /// Buffered entries at or below `buffer_end_seq` are discarded; later
    /// ones that became contiguous are returned for delivery.
    pub fn apply_sync(&mut self, buffer_end_seq: u64) -> ChunkOutcome {
        self.last_contiguous = buffer_end_seq;
        self.gap_marker = None;
        let mut delivered = Vec::new();
        match self.drain_into(&mut delivered) {
            Some(reason) => ChunkOutcome::DeliveredThenResync(delivered, reason),
            None => ChunkOutcome::Delivered(delivered),
        }
    }

    /// Drop everything and restart at `anchor`.
    pub fn reset(&mut self, anchor: u64) {
        self.last_contiguous = anchor;
        self.pending.clear();
        self.gap_marker = None;
    }
}

/// Last sequence covered by `count` chunks starting at `start`.
const fn last_seq(start: u64, count: u64) -> u64 {
    start.saturating_add(count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(seq: u64, data: &str) -> TerminalChunk {
        TerminalChunk {
            seq,
            data: data.to_string(),
        }
    }

    fn delivered(outcome: ChunkOutcome) -> Vec<String> {
        match outcome {
            ChunkOutcome::Delivered(chunks) => chunks,
            other => panic!("Expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn test_in_order_delivery() {
        let mut r = SequenceReassembler::new(100);
        assert_eq!(delivered(r.on_chunk(chunk(1, "a"))), vec!["a"]);
        assert_eq!(delivered(r.on_chunk(chunk(2, "b"))), vec!["b"]);
        assert_eq!(r.last_contiguous(), 2);
    }

    #[test]
    fn test_reverse_order_drains_once_gap_closes() {
        let mut r = SequenceReassembler::new(100);
        assert_eq!(r.on_chunk(chunk(3, "c")), ChunkOutcome::Buffered { opened_gap: true });
        assert_eq!(r.on_chunk(chunk(2, "b")), ChunkOutcome::Buffered { opened_gap: false });
        assert_eq!(delivered(r.on_chunk(chunk(1, "a"))), vec!["a", "b", "c"]);
        assert_eq!(r.last_contiguous(), 3);
        assert_eq!(r.pending_len(), 0);
    }

    #[test]
    fn test_any_permutation_delivers_in_order() {
        let orders: [[u64; 5]; 4] = [
            [5, 4, 3, 2, 1],
            [2, 4, 1, 5, 3],
            [1, 3, 5, 2, 4],
            [3, 1, 2, 5, 4],
        ];
        for order in orders {
            let mut r = SequenceReassembler::new(100);
            let mut out = Vec::new();
            for seq in order {
                if let ChunkOutcome::Delivered(chunks) = r.on_chunk(chunk(seq, &seq.to_string())) {
                    out.extend(chunks);
                }
            }
            assert_eq!(out, vec!["1", "2", "3", "4", "5"], "order {order:?}");
            assert_eq!(r.pending_len(), 0);
        }
    }

    #[test]
    fn test_redelivery_is_ignored() {
        let mut r = SequenceReassembler::new(100);
        delivered(r.on_chunk(chunk(1, "a")));
        assert_eq!(r.on_chunk(chunk(1, "a")), ChunkOutcome::Duplicate);
        assert_eq!(r.on_chunk(chunk(0, "z")), ChunkOutcome::Duplicate);
        assert_eq!(r.on_chunk(chunk(4, "d")), ChunkOutcome::Buffered { opened_gap: true });
        assert_eq!(r.on_chunk(chunk(4, "d")), ChunkOutcome::Duplicate);
        assert_eq!(r.last_contiguous(), 1);
        assert_eq!(r.pending_len(), 1);
    }

    #[test]
    fn test_pending_overflow_requests_resync() {
        let mut r = SequenceReassembler::new(3);
        for seq in 3..6 {
            assert!(matches!(r.on_chunk(chunk(seq, "x")), ChunkOutcome::Buffered { .. }));
        }
        assert_eq!(
            r.on_chunk(chunk(6, "x")),
            ChunkOutcome::ResyncNeeded(ResyncReason::PendingOverflow)
        );
        assert_eq!(r.pending_len(), 0);
    }

    #[test]
    fn test_batch_fast_path() {
        let mut r = SequenceReassembler::new(100);
        let batch = ChunkBatch {
            start_seq: 1,
            chunk_count: 3,
            data: "abc".to_string(),
        };
        assert_eq!(delivered(r.on_batch(batch)), vec!["abc"]);
        assert_eq!(r.last_contiguous(), 3);
    }

    #[test]
    fn test_buffered_batch_drains_as_one_entry() {
        let mut r = SequenceReassembler::new(100);
        let batch = ChunkBatch {
            start_seq: 2,
            chunk_count: 3,
            data: "bcd".to_string(),
        };
        assert_eq!(r.on_batch(batch), ChunkOutcome::Buffered { opened_gap: true });
        assert_eq!(r.on_chunk(chunk(5, "e")), ChunkOutcome::Buffered { opened_gap: false });
        assert_eq!(delivered(r.on_chunk(chunk(1, "a"))), vec!["a", "bcd", "e"]);
        assert_eq!(r.last_contiguous(), 5);
    }

    #[test]
    fn test_overlapping_batch_requests_resync() {
        let mut r = SequenceReassembler::new(100);
        delivered(r.on_chunk(chunk(1, "a")));
        delivered(r.on_chunk(chunk(2, "b")));
        let batch = ChunkBatch {
            start_seq: 2,
            chunk_count: 3,
            data: "bcd".to_string(),
        };
        assert_eq!(
            r.on_batch(batch),
            ChunkOutcome::ResyncNeeded(ResyncReason::OverlappingBatch)
        );
        assert_eq!(r.last_contiguous(), 2);
    }

    #[test]
    fn test_straddling_buffered_batch_requests_resync() {
        let mut r = SequenceReassembler::new(100);
        let batch = |start_seq, data: &str| ChunkBatch {
            start_seq,
            chunk_count: 3,
            data: data.to_string(),
        };
        assert!(matches!(r.on_batch(batch(3, "cde")), ChunkOutcome::Buffered { .. }));
        assert!(matches!(r.on_batch(batch(4, "def")), ChunkOutcome::Buffered { .. }));
        delivered(r.on_chunk(chunk(1, "a")));

        assert_eq!(
            r.on_chunk(chunk(2, "b")),
            ChunkOutcome::DeliveredThenResync(
                vec!["b".to_string(), "cde".to_string()],
                ResyncReason::OverlappingBatch
            )
        );
    }

    #[test]
    fn test_apply_sync_reports_straddling_batch() {
        let mut r = SequenceReassembler::new(100);
        let batch = ChunkBatch {
            start_seq: 8,
            chunk_count: 4,
            data: "hijk".to_string(),
        };
        r.on_batch(batch);
        assert_eq!(
            r.apply_sync(9),
            ChunkOutcome::DeliveredThenResync(Vec::new(), ResyncReason::OverlappingBatch)
        );
    }

    #[test]
    fn test_gap_check() {
        let mut r = SequenceReassembler::new(100);
        r.on_chunk(chunk(3, "c"));
        r.mark_gap();
        assert_eq!(r.check_gap(), GapCheck::Stalled);

        r.mark_gap();
        delivered(r.on_chunk(chunk(1, "a")));
        assert_eq!(r.check_gap(), GapCheck::Progressed);

        r.mark_gap();
        delivered(r.on_chunk(chunk(2, "b")));
        assert_eq!(r.check_gap(), GapCheck::Closed);
    }

    #[test]
    fn test_apply_sync_discards_covered_and_drains_rest() {
        let mut r = SequenceReassembler::new(100);
        r.on_chunk(chunk(4, "d"));
        r.on_chunk(chunk(11, "k"));
        r.on_chunk(chunk(12, "l"));

        assert_eq!(delivered(r.apply_sync(10)), vec!["k", "l"]);
        assert_eq!(r.last_contiguous(), 12);
        assert_eq!(r.pending_len(), 0);
    }

    #[test]
    fn test_reset_anchors_position() {
        let mut r = SequenceReassembler::new(100);
        r.on_chunk(chunk(9, "i"));
        r.reset(41);
        assert_eq!(r.last_contiguous(), 41);
        assert_eq!(r.pending_len(), 0);
        assert_eq!(delivered(r.on_chunk(chunk(42, "x"))), vec!["x"]);
    }
}
