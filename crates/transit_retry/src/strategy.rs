//! Retry strategies.
//!
//! Attempt counts are 1-based: after the first call fails the caller asks
//! `can_try_again(1)`. A strategy with `max_attempts = 3` therefore allows
//! three retries after the initial call.

use std::fmt::Debug;

/// Decides whether and when a failed operation may be attempted again.
pub trait RetryStrategy: Send + Sync + Debug {
    /// Returns true if another attempt is allowed after `attempts` failures.
    fn can_try_again(&self, attempts: u32) -> bool;

    /// Returns the full wait before the next attempt after `attempts`
    /// failures.
    fn next_interval_millis(&self, attempts: u32) -> u64;

    /// Returns the wait still owed, given that `elapsed_millis` have passed
    /// since the failed attempt started.
    fn remaining_interval_millis(&self, attempts: u32, elapsed_millis: u64) -> u64 {
        self.next_interval_millis(attempts)
            .saturating_sub(elapsed_millis)
    }

    /// Returns true if a caller may skip the failed item once this strategy
    /// gives up, instead of failing the whole job.
    fn can_skip(&self) -> bool {
        false
    }
}

/// Waits `initial * multiplier^(n-1)` milliseconds before retry `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoffStrategy {
    max_attempts: u32,
    initial_interval_millis: u64,
    multiplier: f64,
}

impl ExponentialBackoffStrategy {
    /// Creates a new exponential backoff strategy.
    #[must_use]
    pub fn new(max_attempts: u32, initial_interval_millis: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_interval_millis,
            multiplier,
        }
    }

    /// Returns the maximum number of retries.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn can_try_again(&self, attempts: u32) -> bool {
        attempts <= self.max_attempts
    }

    fn next_interval_millis(&self, attempts: u32) -> u64 {
        let exponent = attempts.max(1) - 1;
        let interval =
            self.initial_interval_millis as f64 * self.multiplier.powi(exponent as i32);
        if interval.is_finite() && interval < u64::MAX as f64 {
            interval as u64
        } else {
            u64::MAX
        }
    }
}

/// Waits the same interval before every retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformRetryStrategy {
    max_attempts: u32,
    interval_millis: u64,
}

impl UniformRetryStrategy {
    /// Creates a new uniform strategy.
    #[must_use]
    pub fn new(max_attempts: u32, interval_millis: u64) -> Self {
        Self {
            max_attempts,
            interval_millis,
        }
    }
}

impl RetryStrategy for UniformRetryStrategy {
    fn can_try_again(&self, attempts: u32) -> bool {
        attempts <= self.max_attempts
    }

    fn next_interval_millis(&self, _attempts: u32) -> u64 {
        self.interval_millis
    }
}

/// Never retries, but lets the caller skip the failed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipRetryStrategy;

impl RetryStrategy for SkipRetryStrategy {
    fn can_try_again(&self, _attempts: u32) -> bool {
        false
    }

    fn next_interval_millis(&self, _attempts: u32) -> u64 {
        0
    }

    fn can_skip(&self) -> bool {
        true
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetryStrategy;

impl RetryStrategy for NoRetryStrategy {
    fn can_try_again(&self, _attempts: u32) -> bool {
        false
    }

    fn next_interval_millis(&self, _attempts: u32) -> u64 {
        0
    }
}
