//! Backoff scheduling for the `retry` node type.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Every attempt waits the same `initial_delay`.
    Fixed,
    /// Delay doubles (times `multiplier`) each attempt, capped at `max_delay`.
    Exponential,
}

/// Configuration for a `retry` node: how many attempts, and how long to
/// wait between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub kind: BackoffKind,
    /// Full jitter: scales the computed delay by a random factor in
    /// `[0, 1)` instead of using it verbatim, so that many nodes retrying
    /// the same downstream service don't all wake up in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            kind: BackoffKind::Exponential,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, initial_delay: delay, max_delay: delay, multiplier: 1.0, kind: BackoffKind::Fixed, jitter: false }
    }

    /// Whether `attempt` (1-based, the attempt that just failed) is allowed
    /// another try.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait before attempt `attempt + 1`, given that `attempt`
    /// attempts have already been made.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.kind {
            BackoffKind::Fixed => self.initial_delay,
            BackoffKind::Exponential => {
                let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
                let millis = (self.initial_delay.as_millis() as f64 * factor).min(self.max_delay.as_millis() as f64);
                Duration::from_millis(millis.max(0.0) as u64)
            }
        };
        if self.jitter {
            let scale = fastrand::f64();
            Duration::from_secs_f64(base.as_secs_f64() * scale)
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_never_grows() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(4), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
            kind: BackoffKind::Exponential,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(5), Duration::from_millis(500));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy { max_attempts: 3, ..RetryPolicy::default() };
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn jitter_never_exceeds_base_delay() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(300));
        for _ in 0..20 {
            let jittered = RetryPolicy { jitter: true, ..policy.clone() }.delay_for(1);
            assert!(jittered <= Duration::from_millis(300));
        }
    }

    #[test]
    fn serde_roundtrip() {
        let policy = RetryPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
