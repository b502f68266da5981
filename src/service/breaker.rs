//! Process-wide circuit breaker for upstream service failures.
//!
//! One breaker instance is shared (via `Arc`) by every stage in a run; its
//! purpose is to detect systemic upstream failure across the whole
//! workflow, so it must never be per-stage. While open, stages skip their
//! retry loops and degrade immediately; a single success closes it again.

use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{error, info};

/// Consecutive-failure counter with an open/closed threshold.
pub struct CircuitBreaker {
    failures: AtomicU32,
    threshold: u32,
}

impl CircuitBreaker {
    /// `threshold` is the number of consecutive failures after which the
    /// breaker opens.
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: AtomicU32::new(0),
            threshold,
        }
    }

    /// Record a failed service call.
    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures == self.threshold {
            error!(
                failures,
                "circuit breaker opened; subsequent stage calls degrade immediately"
            );
        }
    }

    /// Record a successful service call; closes the breaker.
    pub fn record_success(&self) {
        let previous = self.failures.swap(0, Ordering::Relaxed);
        if previous >= self.threshold {
            info!(
                recovered_after = previous,
                "upstream service recovered; circuit breaker closed"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.failures() >= self.threshold
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::default();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failures(), 0);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new(3);
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes_and_resets() {
        let breaker = CircuitBreaker::new(2);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failures(), 0);
    }

    #[test]
    fn test_failures_accumulate_past_threshold() {
        let breaker = CircuitBreaker::new(2);
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.failures(), 4);
        assert!(breaker.is_open());
    }
}
