//! # Fibonacci Backoff
//!
//! Retry delays for transient Controller failures (throttling, 5xx, dropped
//! connections). The sequence grows more slowly than exponential backoff so a
//! short burst of retries stays well inside a task timeout.
//!
//! Sequence with the defaults: 1s, 1s, 2s, 3s, 5s, 8s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_secs: u64,
    /// Previous backoff value in seconds
    prev_secs: u64,
    /// Current backoff value in seconds
    current_secs: u64,
    /// Maximum backoff value in seconds
    max_secs: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(1, 8)
    }
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in seconds
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next backoff in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        let next = self.prev_secs + self.current_secs;
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}
