//! Token-bucket throttling for the `rateLimit` node type.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct State {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket: `capacity` tokens, refilled at `refill_per_sec` tokens
/// per second. `try_acquire` is the only operation — it either takes one
/// token immediately, or reports how long to wait for the next one.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    #[must_use]
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self { capacity, refill_per_sec, state: Mutex::new(State { tokens: capacity, last_refill: Instant::now() }) }
    }

    /// Attempt to take one token. `Ok(())` means proceed now; `Err(delay)`
    /// means the caller should re-offer this dispatch after `delay`.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - state.tokens;
            let wait = deficit / self.refill_per_sec;
            Err(Duration::from_secs_f64(wait.max(0.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn acquires_up_to_capacity_then_blocks() {
        let bucket = TokenBucket::new(2.0, 1.0);
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_err());
    }

    #[test]
    fn refills_over_time() {
        let bucket = TokenBucket::new(1.0, 100.0);
        assert!(bucket.try_acquire().is_ok());
        sleep(Duration::from_millis(20));
        assert!(bucket.try_acquire().is_ok());
    }

    #[test]
    fn reports_a_positive_wait_when_exhausted() {
        let bucket = TokenBucket::new(1.0, 1.0);
        bucket.try_acquire().unwrap();
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait > Duration::from_millis(0));
        assert!(wait <= Duration::from_secs(1));
    }
}
