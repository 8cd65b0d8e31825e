//! Reconnect backoff policy.

use std::time::Duration;

/// Exponential backoff with a cap and a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay (before jitter).
    pub max_delay_ms: u64,
    /// Random jitter added on top of each delay (0 = deterministic).
    pub jitter_ms: u64,
    /// Consecutive failed attempts tolerated before giving up (0 = infinite).
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ms: 0,
            max_attempts: 10,
        }
    }
}

impl BackoffPolicy {
    /// Deterministic delay for the given 1-based attempt: `base * 2^(attempt-1)`, capped.
    ///
    /// attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base, ...
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delay for the given attempt including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(rand_jitter(self.jitter_ms))
    }

    /// Whether `failures` consecutive failures exhaust the retry budget.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures > self.max_attempts
    }
}

/// Pseudo-random jitter in `[0, max_ms)` from the clock's sub-second nanos.
fn rand_jitter(max_ms: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if max_ms == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % max_ms
}
