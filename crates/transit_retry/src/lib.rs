//! # Transit Retry
//!
//! A generic retry engine for fallible connector calls.
//!
//! Which calls get retried, and how, is configuration rather than code: a
//! [`RetryStrategyLibrary`] is an ordered list of [`RetryMapping`]s, each
//! binding a set of regular expressions to a [`RetryStrategy`]. A failure's
//! text is matched against the mappings in order and the first match wins;
//! unmatched failures use the library's default strategy.
//!
//! [`RetryingCallable`] drives an operation through that library, sleeping
//! between attempts and giving up with [`RetryError::Exhausted`] once the
//! selected strategy says no.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use transit_retry::{
//!     ExponentialBackoffStrategy, NoRetryStrategy, RetryMapping, RetryStrategyLibrary,
//!     RetryingCallable,
//! };
//!
//! let library = RetryStrategyLibrary::new(
//!     vec![RetryMapping::new(
//!         &["(?i)timed out", "503"],
//!         Arc::new(ExponentialBackoffStrategy::new(3, 1, 2.0)),
//!     )
//!     .unwrap()],
//!     Arc::new(NoRetryStrategy),
//! );
//!
//! let mut calls = 0;
//! let result = RetryingCallable::new(&library, || {
//!     calls += 1;
//!     if calls < 3 { Err("request timed out") } else { Ok(calls) }
//! })
//! .call();
//! assert_eq!(result.unwrap(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callable;
mod config;
mod error;
mod library;
mod strategy;

pub use callable::{Clock, RetryingCallable, Sleeper, SystemClock, ThreadSleeper};
pub use config::{RetryLibraryConfig, RetryMappingConfig, RetryStrategyConfig};
pub use error::{RetryConfigError, RetryError, RetryResult};
pub use library::{RetryMapping, RetryStrategyLibrary};
pub use strategy::{
    ExponentialBackoffStrategy, NoRetryStrategy, RetryStrategy, SkipRetryStrategy,
    UniformRetryStrategy,
};
