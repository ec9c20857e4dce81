//! At-most-once item imports.
//!
//! One [`IdempotentImportExecutor`] lives for one job attempt. Every item
//! import goes through it under a key that is stable across attempts of the
//! same job. A key that has succeeded is never executed again; its result is
//! cached and handed to dependent items through
//! [`get_cached_value`](IdempotentImportExecutor::get_cached_value).
//!
//! A key that failed is not cached, so a later call with the same key runs
//! the import again.

use crate::error::{ConnectorError, TransferError, TransferResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use transit_retry::{RetryStrategyLibrary, RetryingCallable, Sleeper, ThreadSleeper};
use uuid::Uuid;

/// A failed item, as reported by [`IdempotentImportExecutor::errors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Item key.
    pub key: String,
    /// Human-readable item description.
    pub description: String,
    /// The final failure message.
    pub message: String,
    /// Whether the retry strategy marked the failure as skippable.
    pub can_skip: bool,
}

/// Outcome recorded for one item key.
#[derive(Clone)]
pub enum ItemImportResult {
    /// The import succeeded; the value is cached for dependents.
    Success(Arc<dyn Any + Send + Sync>),
    /// The import failed.
    Failure(ErrorDetail),
}

impl ItemImportResult {
    /// Returns true for a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl std::fmt::Debug for ItemImportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Success(..)"),
            Self::Failure(detail) => f.debug_tuple("Failure").field(detail).finish(),
        }
    }
}

/// Runs item imports at most once per key and caches their results.
pub struct IdempotentImportExecutor {
    job_id: Uuid,
    results: Mutex<HashMap<String, ItemImportResult>>,
    retry: Option<Arc<RetryStrategyLibrary>>,
    sleeper: Arc<dyn Sleeper>,
}

impl IdempotentImportExecutor {
    /// Creates an executor for one attempt of `job_id`.
    #[must_use]
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            results: Mutex::new(HashMap::new()),
            retry: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Wraps every import call with `library`.
    #[must_use]
    pub fn with_retry_library(mut self, library: Arc<RetryStrategyLibrary>) -> Self {
        self.retry = Some(library);
        self
    }

    /// Replaces the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the job id.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Imports an item, swallowing recoverable failures.
    ///
    /// Returns `Ok(Some(value))` on success or when `key` already succeeded,
    /// and `Ok(None)` when the import failed with a recoverable or skippable
    /// error, which is recorded in [`errors`](Self::errors).
    ///
    /// # Errors
    ///
    /// Returns a non-recoverable [`ConnectorError`] unchanged.
    pub fn execute_and_swallow<R, F>(
        &self,
        key: &str,
        description: &str,
        import: F,
    ) -> Result<Option<R>, ConnectorError>
    where
        R: Clone + Send + Sync + 'static,
        F: FnMut() -> Result<R, ConnectorError>,
    {
        if let Some(value) = self.cached(key) {
            debug!(job_id = %self.job_id, item_key = key, "item already imported");
            return Ok(Some(value));
        }

        match self.run(key, description, import) {
            Ok(value) => Ok(Some(value)),
            Err((error, can_skip)) if error.is_recoverable() || can_skip => {
                warn!(
                    job_id = %self.job_id,
                    item_key = key,
                    description,
                    error = %error,
                    "item import failed, continuing"
                );
                Ok(None)
            }
            Err((error, _)) => Err(error),
        }
    }

    /// Imports an item keyed by a hash of its serialized form.
    ///
    /// For items nothing else refers to.
    ///
    /// # Errors
    ///
    /// Fails if the item cannot be serialized, or as
    /// [`execute_and_swallow`](Self::execute_and_swallow).
    pub fn import_and_swallow<I, R, F>(&self, item: &I, import: F) -> Result<Option<R>, ConnectorError>
    where
        I: Serialize,
        R: Clone + Send + Sync + 'static,
        F: FnMut() -> Result<R, ConnectorError>,
    {
        let key = item_key(item)?;
        self.execute_and_swallow(&key, &key, import)
    }

    /// Imports an item whose failure must stop the job.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Item`] on any failure.
    pub fn execute_or_fail<R, F>(&self, key: &str, description: &str, import: F) -> TransferResult<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnMut() -> Result<R, ConnectorError>,
    {
        if let Some(value) = self.cached(key) {
            return Ok(value);
        }
        self.run(key, description, import)
            .map_err(|(source, _)| TransferError::Item {
                key: key.to_string(),
                source,
            })
    }

    /// Returns the cached result of a successful import.
    ///
    /// # Panics
    ///
    /// Panics if `key` never succeeded or was cached with another type.
    /// Asking for a value that was never stored is a caller bug.
    #[track_caller]
    pub fn get_cached_value<R>(&self, key: &str) -> R
    where
        R: Clone + 'static,
    {
        match self.results.lock().get(key) {
            Some(ItemImportResult::Success(value)) => match value.downcast_ref::<R>() {
                Some(value) => value.clone(),
                None => panic!(
                    "cached value for {key:?} is not a {}",
                    std::any::type_name::<R>()
                ),
            },
            Some(ItemImportResult::Failure(_)) => {
                panic!("no cached value for {key:?}: the import failed")
            }
            None => panic!("no cached value for {key:?}: never imported"),
        }
    }

    /// Returns true if `key` has succeeded.
    pub fn is_key_cached(&self, key: &str) -> bool {
        self.results
            .lock()
            .get(key)
            .is_some_and(ItemImportResult::is_success)
    }

    /// Returns the recorded result for `key`.
    pub fn result(&self, key: &str) -> Option<ItemImportResult> {
        self.results.lock().get(key).cloned()
    }

    /// Returns every currently failed item.
    pub fn errors(&self) -> Vec<ErrorDetail> {
        let mut errors: Vec<_> = self
            .results
            .lock()
            .values()
            .filter_map(|result| match result {
                ItemImportResult::Failure(detail) => Some(detail.clone()),
                ItemImportResult::Success(_) => None,
            })
            .collect();
        errors.sort_by(|a, b| a.key.cmp(&b.key));
        errors
    }

    /// Returns the number of successfully imported keys.
    pub fn success_count(&self) -> usize {
        self.results
            .lock()
            .values()
            .filter(|r| r.is_success())
            .count()
    }

    #[track_caller]
    fn cached<R: Clone + 'static>(&self, key: &str) -> Option<R> {
        if self.is_key_cached(key) {
            Some(self.get_cached_value(key))
        } else {
            None
        }
    }

    /// Runs the import, with retries if configured, and records the outcome.
    fn run<R, F>(
        &self,
        key: &str,
        description: &str,
        mut import: F,
    ) -> Result<R, (ConnectorError, bool)>
    where
        R: Clone + Send + Sync + 'static,
        F: FnMut() -> Result<R, ConnectorError>,
    {
        let outcome = match &self.retry {
            Some(library) => RetryingCallable::new(library, &mut import)
                .with_sleeper(Arc::clone(&self.sleeper))
                .call()
                .map_err(|err| {
                    let can_skip = err.can_skip();
                    (err.into_source(), can_skip)
                }),
            None => import().map_err(|err| (err, false)),
        };

        let record = match &outcome {
            Ok(value) => ItemImportResult::Success(Arc::new(value.clone())),
            Err((error, can_skip)) => ItemImportResult::Failure(ErrorDetail {
                key: key.to_string(),
                description: description.to_string(),
                message: error.to_string(),
                can_skip: *can_skip,
            }),
        };
        self.results.lock().insert(key.to_string(), record);
        outcome
    }
}

impl std::fmt::Debug for IdempotentImportExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotentImportExecutor")
            .field("job_id", &self.job_id)
            .field("items", &self.results.lock().len())
            .finish_non_exhaustive()
    }
}

/// Derives a stable key from an item's JSON form.
///
/// # Errors
///
/// Returns a fatal error if the item cannot be serialized.
pub fn item_key<I: Serialize>(item: &I) -> Result<String, ConnectorError> {
    let bytes = serde_json::to_vec(item)
        .map_err(|e| ConnectorError::fatal(format!("cannot serialize item: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(&bytes)))
}
