//! Error types for the retry engine.

use thiserror::Error;

/// Result type for building retry libraries.
pub type RetryResult<T> = Result<T, RetryConfigError>;

/// Failure of a [`RetryingCallable`](crate::RetryingCallable).
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The selected strategy refused another attempt.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Whether the strategy allows the caller to skip the failed item.
        can_skip: bool,
        /// The most recent failure.
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Returns the number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Returns true if the strategy marked the failure as skippable.
    pub fn can_skip(&self) -> bool {
        match self {
            RetryError::Exhausted { can_skip, .. } => *can_skip,
        }
    }

    /// Returns the most recent failure.
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Errors raised while building a retry library from configuration.
#[derive(Debug, Error)]
pub enum RetryConfigError {
    /// A mapping pattern is not a valid regular expression.
    #[error("invalid retry pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Regex compiler error.
        #[source]
        source: regex::Error,
    },

    /// A mapping has no patterns at all.
    #[error("retry mapping {index} has no patterns")]
    EmptyMapping {
        /// Position of the mapping in the library.
        index: usize,
    },

    /// A strategy parameter is out of range.
    #[error("invalid retry strategy: {message}")]
    InvalidStrategy {
        /// Description of the problem.
        message: String,
    },

    /// The configuration document could not be parsed.
    #[error("retry configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
