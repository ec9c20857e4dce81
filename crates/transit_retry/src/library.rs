//! Pattern-to-strategy mappings.

use crate::error::{RetryConfigError, RetryResult};
use crate::strategy::{NoRetryStrategy, RetryStrategy};
use regex::Regex;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Binds a strategy to the failures whose text matches any of its patterns.
#[derive(Debug, Clone)]
pub struct RetryMapping {
    patterns: Vec<Regex>,
    strategy: Arc<dyn RetryStrategy>,
}

impl RetryMapping {
    /// Compiles `patterns` into a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError::InvalidPattern`] for a bad regex.
    pub fn new<S: AsRef<str>>(
        patterns: &[S],
        strategy: Arc<dyn RetryStrategy>,
    ) -> RetryResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| RetryConfigError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<RetryResult<Vec<_>>>()?;
        Ok(Self { patterns, strategy })
    }

    /// Returns true if any pattern matches `description`.
    #[must_use]
    pub fn matches(&self, description: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(description))
    }

    /// Returns the mapped strategy.
    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.strategy
    }
}

/// An ordered list of mappings plus a default strategy.
#[derive(Debug, Clone)]
pub struct RetryStrategyLibrary {
    mappings: Vec<RetryMapping>,
    default_strategy: Arc<dyn RetryStrategy>,
}

impl RetryStrategyLibrary {
    /// Creates a library. Mappings are consulted in order.
    #[must_use]
    pub fn new(mappings: Vec<RetryMapping>, default_strategy: Arc<dyn RetryStrategy>) -> Self {
        Self {
            mappings,
            default_strategy,
        }
    }

    /// A library that never retries anything.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(Vec::new(), Arc::new(NoRetryStrategy))
    }

    /// Selects the strategy for `error`.
    ///
    /// Both the `Display` and the `Debug` rendering are matched, so
    /// patterns may target either the message or the error variant name.
    pub fn checkout_retry_strategy<E>(&self, error: &E) -> Arc<dyn RetryStrategy>
    where
        E: Display + Debug + ?Sized,
    {
        let description = format!("{error}\n{error:?}");
        self.checkout_for_description(&description)
    }

    /// Selects the strategy for a failure description.
    #[must_use]
    pub fn checkout_for_description(&self, description: &str) -> Arc<dyn RetryStrategy> {
        self.mappings
            .iter()
            .find(|m| m.matches(description))
            .map_or_else(
                || Arc::clone(&self.default_strategy),
                |m| Arc::clone(&m.strategy),
            )
    }

    /// Returns the number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if the library has no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for RetryStrategyLibrary {
    fn default() -> Self {
        Self::no_retry()
    }
}
