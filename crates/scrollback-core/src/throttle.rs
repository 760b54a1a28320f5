//! Debouncing of load-more triggers and the empty-page retry counter.

use serde::{Deserialize, Serialize};

/// Minimum spacing between two load-more fetches, in milliseconds
pub const SCROLL_DEBOUNCE_MS: u64 = 200;

/// Consecutive empty merges tolerated before giving up
pub const MAX_RETRY_COUNT: u32 = 3;

/// What the retry counter did with a merge outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    /// The merge produced new items; counter reset
    Settled,
    /// Nothing new; counter incremented and another attempt is worthwhile
    Retry,
    /// Nothing new and retries are exhausted (or history too short); counter reset
    GiveUp,
}

/// Gates rapid load-more triggers and counts unproductive merges.
#[derive(Debug, Clone)]
pub struct RetryThrottle {
    debounce_ms: u64,
    max_retries: u32,
    last_load_time: Option<u64>,
    retry_count: u32,
}

impl Default for RetryThrottle {
    fn default() -> Self {
        Self::new(SCROLL_DEBOUNCE_MS, MAX_RETRY_COUNT)
    }
}

impl RetryThrottle {
    pub fn new(debounce_ms: u64, max_retries: u32) -> Self {
        Self {
            debounce_ms,
            max_retries,
            last_load_time: None,
            retry_count: 0,
        }
    }

    /// Returns `true` if a fetch at `now` must be skipped. Otherwise records
    /// `now` as the last load time.
    pub fn should_throttle(&mut self, now: u64) -> bool {
        if let Some(last) = self.last_load_time {
            if now.saturating_sub(last) < self.debounce_ms {
                return true;
            }
        }
        self.last_load_time = Some(now);
        false
    }

    /// Update the retry counter from a merge that added `unique_count` items
    /// to a history that held `prev_items_len` items before.
    pub fn on_merge_result(&mut self, unique_count: usize, prev_items_len: usize) -> RetryDecision {
        if unique_count > 0 {
            self.retry_count = 0;
            return RetryDecision::Settled;
        }

        if self.retry_count < self.max_retries && prev_items_len > 1 {
            self.retry_count += 1;
            RetryDecision::Retry
        } else {
            self.retry_count = 0;
            RetryDecision::GiveUp
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_window() {
        let mut throttle = RetryThrottle::default();
        assert!(!throttle.should_throttle(1000));
        assert!(throttle.should_throttle(1100));
        assert!(!throttle.should_throttle(1300));
    }

    #[test]
    fn test_throttled_call_does_not_move_window() {
        let mut throttle = RetryThrottle::default();
        assert!(!throttle.should_throttle(1000));
        assert!(throttle.should_throttle(1199));
        // Window still measured from 1000, not 1199
        assert!(!throttle.should_throttle(1200));
    }

    #[test]
    fn test_first_call_never_throttled() {
        let mut throttle = RetryThrottle::default();
        assert!(!throttle.should_throttle(0));
    }

    #[test]
    fn test_retry_counter_bounded_then_resets() {
        let mut throttle = RetryThrottle::default();
        for expected in 1..=MAX_RETRY_COUNT {
            assert_eq!(throttle.on_merge_result(0, 10), RetryDecision::Retry);
            assert_eq!(throttle.retry_count(), expected);
        }
        assert_eq!(throttle.retry_count(), 3);

        assert_eq!(throttle.on_merge_result(0, 10), RetryDecision::GiveUp);
        assert_eq!(throttle.retry_count(), 0);
    }

    #[test]
    fn test_retry_counter_never_exceeds_max() {
        let mut throttle = RetryThrottle::default();
        for _ in 0..20 {
            throttle.on_merge_result(0, 10);
            assert!(throttle.retry_count() <= MAX_RETRY_COUNT);
        }
    }

    #[test]
    fn test_short_history_gives_up_immediately() {
        let mut throttle = RetryThrottle::default();
        assert_eq!(throttle.on_merge_result(0, 1), RetryDecision::GiveUp);
        assert_eq!(throttle.retry_count(), 0);
        assert_eq!(throttle.on_merge_result(0, 0), RetryDecision::GiveUp);
    }

    #[test]
    fn test_new_items_reset_counter() {
        let mut throttle = RetryThrottle::default();
        throttle.on_merge_result(0, 10);
        throttle.on_merge_result(0, 10);
        assert_eq!(throttle.retry_count(), 2);

        assert_eq!(throttle.on_merge_result(4, 10), RetryDecision::Settled);
        assert_eq!(throttle.retry_count(), 0);
    }
}
