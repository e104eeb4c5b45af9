//! Timer bookkeeping for the single-threaded manager.
//!
//! Timers are plain records: nothing fires on its own. The host asks for the
//! next deadline, waits for it, then pops due timers back into the manager.
//! Cancelling a timer removes its record, so a superseded timer can never
//! be delivered.

use std::{collections::HashMap, fmt, time::Instant};

/// What a timer is for. At most one timer of each kind is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Backoff,
    AckFlush,
    Ping,
    PongTimeout,
    GapRecovery,
    DimensionDebounce,
}

impl TimerKind {
    /// Timers that belong to one open socket.
    pub const CONNECTION_SCOPED: [Self; 5] = [
        Self::AckFlush,
        Self::Ping,
        Self::PongTimeout,
        Self::GapRecovery,
        Self::DimensionDebounce,
    ];
}

/// Unique handle of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    id: TimerId,
    deadline: Instant,
}

/// Armed timers keyed by kind.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    armed: HashMap<TimerKind, Armed>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire at `deadline`, replacing any timer of that kind.
    pub fn arm(&mut self, kind: TimerKind, deadline: Instant) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        if let Some(previous) = self.armed.insert(kind, Armed { id, deadline }) {
            tracing::trace!(?kind, replaced = %previous.id, "Timer re-armed");
        }
        id
    }

    /// Cancel the timer of `kind`. Returns whether one was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.armed.remove(&kind).is_some()
    }

    /// Cancel every armed timer. Returns how many were armed.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.armed.len();
        self.armed.clear();
        count
    }

    #[must_use]
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Earliest armed deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().map(|armed| armed.deadline).min()
    }

    /// Remove and return the earliest timer due at `now`.
    ///
    /// Ties on deadline resolve in arming order.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerKind, TimerId)> {
        let (kind, armed) = self
            .armed
            .iter()
            .filter(|(_, armed)| armed.deadline <= now)
            .min_by_key(|(_, armed)| (armed.deadline, armed.id))
            .map(|(kind, armed)| (*kind, *armed))?;
        self.armed.remove(&kind);
        Some((kind, armed.id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_pop_due_in_deadline_order() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Ping, now + Duration::from_millis(30));
        scheduler.arm(TimerKind::AckFlush, now + Duration::from_millis(10));
        scheduler.arm(TimerKind::GapRecovery, now + Duration::from_millis(20));

        let later = now + Duration::from_millis(25);
        assert_eq!(scheduler.pop_due(later).map(|(k, _)| k), Some(TimerKind::AckFlush));
        assert_eq!(scheduler.pop_due(later).map(|(k, _)| k), Some(TimerKind::GapRecovery));
        assert_eq!(scheduler.pop_due(later), None);
        assert_eq!(scheduler.next_deadline(), Some(now + Duration::from_millis(30)));
    }

    #[test]
    fn test_ties_resolve_in_arming_order() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::PongTimeout, now);
        scheduler.arm(TimerKind::Backoff, now);

        assert_eq!(scheduler.pop_due(now).map(|(k, _)| k), Some(TimerKind::PongTimeout));
        assert_eq!(scheduler.pop_due(now).map(|(k, _)| k), Some(TimerKind::Backoff));
    }

    #[test]
    fn test_rearm_replaces_and_cancel_removes() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        let first = scheduler.arm(TimerKind::DimensionDebounce, now);
        let second = scheduler.arm(TimerKind::DimensionDebounce, now + Duration::from_secs(1));
        assert_ne!(first, second);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pop_due(now), None);

        assert!(scheduler.cancel(TimerKind::DimensionDebounce));
        assert!(!scheduler.cancel(TimerKind::DimensionDebounce));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Backoff, now);
        scheduler.arm(TimerKind::Ping, now);
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.next_deadline(), None);
    }
}
