//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How an unfilled sequence gap is recovered once the gap timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapRecovery {
    /// Drop local stream state and restart from the server's buffer.
    #[default]
    FullResync,
    /// Ask the server to replay everything after the last contiguous sequence.
    Resume,
}

/// Configuration for one session connection.
///
/// Every timing is in milliseconds so the struct can be loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket URL of the session.
    pub url: String,
    /// First backoff step.
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to each backoff.
    pub jitter_max_ms: u64,
    /// Backoff ceiling.
    pub max_delay_ms: u64,
    /// Consecutive failed attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Ack coalescing window.
    pub ack_interval_ms: u64,
    /// Ping period while connected.
    pub ping_interval_ms: u64,
    /// How long a ping may go unanswered.
    pub pong_timeout_ms: u64,
    /// Consecutive missed pongs that force a reconnect.
    pub max_missed_pongs: u32,
    /// Silence after which the connection is reported stale.
    pub stale_threshold_ms: u64,
    /// How long a sequence gap may stay open.
    pub gap_timeout_ms: u64,
    /// Buffered out-of-order chunks tolerated before a full resync.
    pub max_pending_chunks: usize,
    /// Outbound messages held while disconnected.
    pub max_queue_size: usize,
    /// Quiet period before a local resize is acted on.
    pub resize_debounce_ms: u64,
    pub initial_cols: u16,
    pub initial_rows: u16,
    pub gap_recovery: GapRecovery,
    /// Seed for backoff jitter; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            base_delay_ms: 1_000,
            jitter_max_ms: 1_000,
            max_delay_ms: 30_000,
            max_reconnect_attempts: 10,
            ack_interval_ms: 100,
            ping_interval_ms: 15_000,
            pong_timeout_ms: 5_000,
            max_missed_pongs: 2,
            stale_threshold_ms: 30_000,
            gap_timeout_ms: 500,
            max_pending_chunks: 100,
            max_queue_size: 50,
            resize_debounce_ms: 200,
            initial_cols: 80,
            initial_rows: 24,
            gap_recovery: GapRecovery::FullResync,
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    /// Create a config for `url` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load a config from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the result fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 7] = [
            ("base_delay_ms", self.base_delay_ms > 0),
            ("max_delay_ms", self.max_delay_ms >= self.base_delay_ms),
            ("ack_interval_ms", self.ack_interval_ms > 0),
            ("ping_interval_ms", self.ping_interval_ms > self.pong_timeout_ms),
            ("max_missed_pongs", self.max_missed_pongs > 0),
            ("max_pending_chunks", self.max_pending_chunks > 0),
            ("initial_cols/initial_rows", self.initial_cols > 0 && self.initial_rows > 0),
        ];
        for (field, ok) in checks {
            if !ok {
                return Err(ConfigError::Invalid { field });
            }
        }
        Ok(())
    }

    /// Set the reconnect attempt limit.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the backoff parameters.
    #[must_use]
    pub const fn with_backoff(mut self, base_ms: u64, jitter_max_ms: u64, max_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.jitter_max_ms = jitter_max_ms;
        self.max_delay_ms = max_ms;
        self
    }

    /// Set the outbound queue capacity.
    #[must_use]
    pub const fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set the gap recovery strategy.
    #[must_use]
    pub const fn with_gap_recovery(mut self, recovery: GapRecovery) -> Self {
        self.gap_recovery = recovery;
        self
    }

    /// Set the initial terminal size.
    #[must_use]
    pub const fn with_initial_dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.initial_cols = cols;
        self.initial_rows = rows;
        self
    }

    /// Fix the jitter seed.
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn ack_interval(&self) -> Duration {
        Duration::from_millis(self.ack_interval_ms)
    }

    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    #[must_use]
    pub const fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }

    #[must_use]
    pub const fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    #[must_use]
    pub const fn gap_timeout(&self) -> Duration {
        Duration::from_millis(self.gap_timeout_ms)
    }

    #[must_use]
    pub const fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.ack_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"url":"ws://localhost/ws","max_queue_size":5}"#)
                .unwrap();
        assert_eq!(config.url, "ws://localhost/ws");
        assert_eq!(config.max_queue_size, 5);
        assert_eq!(config.ping_interval_ms, 15_000);
        assert_eq!(config.gap_recovery, GapRecovery::FullResync);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = SessionConfig::from_json_str(r#"{"ping_interval_ms":1000}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ping_interval_ms" }));

        let err = SessionConfig::from_json_str("42").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_gap_recovery_snake_case() {
        let config = SessionConfig::from_json_str(r#"{"gap_recovery":"resume"}"#).unwrap();
        assert_eq!(config.gap_recovery, GapRecovery::Resume);
    }
}
