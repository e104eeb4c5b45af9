//! Ping/pong liveness tracking.
//!
//! A half-open socket keeps reporting itself open while no data flows, so
//! liveness is judged from pongs alone: a silence longer than the staleness
//! threshold is reported as `stale`, and enough consecutive unanswered
//! pings force a reconnect.

use std::time::{Duration, Instant};

/// Verdict after a pong timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PongVerdict {
    /// Keep waiting; fewer than the allowed misses so far.
    Tolerated { missed: u32 },
    /// Too many consecutive misses.
    ForceReconnect { missed: u32 },
}

/// Heartbeat state for the current socket.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    max_missed_pongs: u32,
    stale_threshold: Duration,
    missed_pongs: u32,
    last_pong_at: Option<Instant>,
}

impl HeartbeatMonitor {
    #[must_use]
    pub const fn new(max_missed_pongs: u32, stale_threshold: Duration) -> Self {
        Self {
            max_missed_pongs,
            stale_threshold,
            missed_pongs: 0,
            last_pong_at: None,
        }
    }

    /// Begin monitoring a freshly opened socket.
    pub const fn start(&mut self, now: Instant) {
        self.missed_pongs = 0;
        self.last_pong_at = Some(now);
    }

    /// Stop monitoring.
    pub const fn stop(&mut self) {
        self.missed_pongs = 0;
        self.last_pong_at = None;
    }

    #[must_use]
    pub const fn missed_pongs(&self) -> u32 {
        self.missed_pongs
    }

    /// Any pong clears the miss count.
    pub const fn pong_received(&mut self, now: Instant) {
        self.missed_pongs = 0;
        self.last_pong_at = Some(now);
    }

    /// Count an unanswered ping.
    pub const fn pong_timed_out(&mut self) -> PongVerdict {
        self.missed_pongs = self.missed_pongs.saturating_add(1);
        if self.missed_pongs >= self.max_missed_pongs {
            PongVerdict::ForceReconnect {
                missed: self.missed_pongs,
            }
        } else {
            PongVerdict::Tolerated {
                missed: self.missed_pongs,
            }
        }
    }

    /// Whether no pong arrived within the staleness threshold.
    #[must_use]
    pub fn is_stale(&self, now: Instant) -> bool {
        self.last_pong_at
            .is_some_and(|last| now.saturating_duration_since(last) >= self.stale_threshold)
    }
}
