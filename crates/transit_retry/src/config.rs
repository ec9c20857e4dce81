//! Serialized retry configuration.
//!
//! ```json
//! {
//!   "mappings": [
//!     { "regexes": ["(?i)timed out", "503"],
//!       "strategy": { "type": "exponential", "max_attempts": 3,
//!                     "initial_interval_millis": 100, "multiplier": 2.0 } }
//!   ],
//!   "default_strategy": { "type": "none" }
//! }
//! ```

use crate::error::{RetryConfigError, RetryResult};
use crate::library::{RetryMapping, RetryStrategyLibrary};
use crate::strategy::{
    ExponentialBackoffStrategy, NoRetryStrategy, RetryStrategy, SkipRetryStrategy,
    UniformRetryStrategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A strategy as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryStrategyConfig {
    /// See [`ExponentialBackoffStrategy`].
    Exponential {
        /// Retries allowed after the first call.
        max_attempts: u32,
        /// Wait before the first retry.
        initial_interval_millis: u64,
        /// Growth factor, at least 1.0.
        multiplier: f64,
    },
    /// See [`UniformRetryStrategy`].
    Uniform {
        /// Retries allowed after the first call.
        max_attempts: u32,
        /// Wait before every retry.
        interval_millis: u64,
    },
    /// See [`SkipRetryStrategy`].
    Skip,
    /// See [`NoRetryStrategy`].
    #[serde(rename = "none")]
    NoRetry,
}

impl RetryStrategyConfig {
    /// Instantiates the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError::InvalidStrategy`] for a multiplier below
    /// 1.0 or not finite.
    pub fn build(&self) -> RetryResult<Arc<dyn RetryStrategy>> {
        Ok(match *self {
            RetryStrategyConfig::Exponential {
                max_attempts,
                initial_interval_millis,
                multiplier,
            } => {
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(RetryConfigError::InvalidStrategy {
                        message: format!("multiplier must be >= 1.0, got {multiplier}"),
                    });
                }
                Arc::new(ExponentialBackoffStrategy::new(
                    max_attempts,
                    initial_interval_millis,
                    multiplier,
                ))
            }
            RetryStrategyConfig::Uniform {
                max_attempts,
                interval_millis,
            } => Arc::new(UniformRetryStrategy::new(max_attempts, interval_millis)),
            RetryStrategyConfig::Skip => Arc::new(SkipRetryStrategy),
            RetryStrategyConfig::NoRetry => Arc::new(NoRetryStrategy),
        })
    }
}

impl Default for RetryStrategyConfig {
    fn default() -> Self {
        RetryStrategyConfig::NoRetry
    }
}

/// One `regexes -> strategy` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryMappingConfig {
    /// Patterns matched against the failure text.
    pub regexes: Vec<String>,
    /// Strategy used on a match.
    pub strategy: RetryStrategyConfig,
}

/// An ordered list of mappings plus the default strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryLibraryConfig {
    /// Mappings in priority order.
    #[serde(default)]
    pub mappings: Vec<RetryMappingConfig>,
    /// Strategy for failures no mapping matches.
    #[serde(default)]
    pub default_strategy: RetryStrategyConfig,
}

impl RetryLibraryConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError::Parse`] for malformed JSON.
    pub fn from_json(text: &str) -> RetryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compiles the configuration into a library.
    ///
    /// # Errors
    ///
    /// Fails on an empty mapping, an invalid pattern or an out-of-range
    /// strategy parameter.
    pub fn build(&self) -> RetryResult<RetryStrategyLibrary> {
        let mappings = self
            .mappings
            .iter()
            .enumerate()
            .map(|(index, mapping)| {
                if mapping.regexes.is_empty() {
                    return Err(RetryConfigError::EmptyMapping { index });
                }
                RetryMapping::new(mapping.regexes.as_slice(), mapping.strategy.build()?)
            })
            .collect::<RetryResult<Vec<_>>>()?;
        Ok(RetryStrategyLibrary::new(
            mappings,
            self.default_strategy.build()?,
        ))
    }
}
