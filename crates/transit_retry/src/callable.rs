//! Driving an operation through a retry library.

use crate::error::RetryError;
use crate::library::RetryStrategyLibrary;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Blocks the current thread between attempts.
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Reads [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Runs an operation until it succeeds or the matching strategy gives up.
///
/// The wait before each retry is the strategy's interval minus the time the
/// failed attempt itself took.
pub struct RetryingCallable<'a, F> {
    library: &'a RetryStrategyLibrary,
    operation: F,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl<'a, F> RetryingCallable<'a, F> {
    /// Wraps `operation` with the strategies in `library`.
    pub fn new(library: &'a RetryStrategyLibrary, operation: F) -> Self {
        Self {
            library,
            operation,
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the operation.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Exhausted`] carrying the last failure once the
    /// selected strategy refuses another attempt.
    pub fn call<T, E>(mut self) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Display + Debug,
    {
        let mut attempts: u32 = 0;
        loop {
            let started = self.clock.now();
            attempts = attempts.saturating_add(1);

            let err = match (self.operation)() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let strategy = self.library.checkout_retry_strategy(&err);
            if !strategy.can_try_again(attempts) {
                return Err(RetryError::Exhausted {
                    attempts,
                    can_skip: strategy.can_skip(),
                    source: err,
                });
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            let elapsed_millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            let wait = strategy.remaining_interval_millis(attempts, elapsed_millis);
            debug!(attempt = attempts, wait_millis = wait, error = %err, "retrying");
            if wait > 0 {
                self.sleeper.sleep(Duration::from_millis(wait));
            }
        }
    }
}

impl<F> Debug for RetryingCallable<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingCallable")
            .field("library", self.library)
            .finish_non_exhaustive()
    }
}
