//! Reconnection policy: attempt counting and exponential backoff with jitter.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::SessionConfig;

/// What to do after a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then reconnect.
    Retry(Duration),
    /// Attempts exhausted.
    GiveUp,
}

/// Backoff before attempt `attempt` (1-indexed), before jitter and capping.
#[must_use]
pub fn exponential_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1);
    base_ms.saturating_mul(2u64.saturating_pow(exponent))
}

/// Reconnection state machine counters and retry policy.
#[derive(Debug)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    jitter_max_ms: u64,
    max_delay_ms: u64,
    max_attempts: u32,
    /// Consecutive failed attempts since the last successful open.
    attempt: u32,
    rng: StdRng,
}

impl ReconnectPolicy {
    /// Create a policy from session settings.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            base_delay_ms: config.base_delay_ms,
            jitter_max_ms: config.jitter_max_ms,
            max_delay_ms: config.max_delay_ms,
            max_attempts: config.max_reconnect_attempts,
            attempt: 0,
            rng,
        }
    }

    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Count a failed attempt and decide whether to retry.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.delay_for(self.attempt))
    }

    /// Compute the jittered, capped delay for `attempt`.
    pub fn delay_for(&mut self, attempt: u32) -> Duration {
        let jitter = if self.jitter_max_ms == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.jitter_max_ms)
        };
        let delay = exponential_delay_ms(self.base_delay_ms, attempt)
            .saturating_add(jitter)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Forget past failures after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, jitter_max_ms: u64) -> ReconnectPolicy {
        let config = SessionConfig::default()
            .with_backoff(1_000, jitter_max_ms, 30_000)
            .with_max_reconnect_attempts(max_attempts)
            .with_rng_seed(7);
        ReconnectPolicy::from_config(&config)
    }

    #[test]
    fn test_exponential_growth() {
        assert_eq!(exponential_delay_ms(1_000, 1), 1_000);
        assert_eq!(exponential_delay_ms(1_000, 2), 2_000);
        assert_eq!(exponential_delay_ms(1_000, 4), 8_000);
        assert_eq!(exponential_delay_ms(1_000, 200), u64::MAX);
    }

    #[test]
    fn test_delay_without_jitter_is_capped() {
        let mut policy = policy(100, 0);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(6), Duration::from_millis(30_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut policy = policy(100, 1_000);
        for _ in 0..50 {
            let delay = policy.delay_for(2).as_millis();
            assert!((2_000..=3_000).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_gives_up_at_limit() {
        let mut policy = policy(3, 0);
        assert!(matches!(policy.record_failure(), RetryDecision::Retry(_)));
        assert!(matches!(policy.record_failure(), RetryDecision::Retry(_)));
        assert_eq!(policy.record_failure(), RetryDecision::GiveUp);
        assert_eq!(policy.attempt(), 3);

        policy.reset();
        assert_eq!(policy.attempt(), 0);
    }
}
