//! Retry schedule for transient API failures.
//!
//! The delay before retry `i` (0-based) is `initial_delay * 2^i`, capped at
//! `max_delay`. With the defaults that is 1s, 2s, 4s, ...

use std::time::Duration;

/// How many times, and how patiently, a failed call is repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Config for the `api_retry_attempts` setting. Zero means no retry policy.
    pub fn from_attempts(attempts: u32) -> Option<Self> {
        (attempts > 0).then(|| Self::default().with_max_attempts(attempts))
    }

    /// Delay before retry `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(multiplier)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Per-request retry state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Retries scheduled so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Consume one retry and return how long to wait first; `None` once spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        let delay = self.config.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
