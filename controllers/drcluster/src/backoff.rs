//! # Fibonacci Backoff
//!
//! Progressive backoff for reconcile errors, growing more slowly than
//! exponential backoff. Sequence: 1s, 1s, 2s, 3s, 5s, 8s, ... capped at the
//! configured maximum. Per-key state lives in the rate limiter so errors on
//! one DRCluster do not slow the others down.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Next backoff duration, advancing the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_secs);

        let next = self.prev_secs + self.current_secs;
        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);

        result
    }

    /// Reset to the initial state after a successful reconcile.
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}

/// Per-key Fibonacci rate limiter for reconcile requeues.
#[derive(Debug)]
pub struct RequeueRateLimiter {
    min_secs: u64,
    max_secs: u64,
    states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl RequeueRateLimiter {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before the next retry of the given key.
    pub fn delay(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap();
        let backoff = states
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min_secs, self.max_secs));

        backoff.next_backoff()
    }

    /// Forget the key's error history after a success.
    pub fn reset(&self, key: &str) {
        self.states.lock().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 60);

        assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(3));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(8));
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(10, 30);

        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(20));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(30));
        // Next would be 50s, but the sequence is capped.
        assert_eq!(backoff.next_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limiter_is_per_key() {
        let limiter = RequeueRateLimiter::new(1, 60);

        assert_eq!(limiter.delay("east"), Duration::from_secs(1));
        assert_eq!(limiter.delay("east"), Duration::from_secs(1));
        assert_eq!(limiter.delay("east"), Duration::from_secs(2));

        // A different key starts fresh.
        assert_eq!(limiter.delay("west"), Duration::from_secs(1));

        limiter.reset("east");
        assert_eq!(limiter.delay("east"), Duration::from_secs(1));
    }
}
