//! Worker configuration.

use crate::error::WorkerResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use transit_retry::RetryLibraryConfig;

/// Configuration for a [`WorkerPollingService`](crate::WorkerPollingService).
///
/// Serialized durations are whole milliseconds:
///
/// ```json
/// {
///   "poll_interval_millis": 1000,
///   "idle_backoff_millis": 5000,
///   "stale_after_millis": 3600000,
///   "retry": { "mappings": [], "default_strategy": { "type": "none" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Wait between polls while a job is held.
    #[serde(rename = "poll_interval_millis", with = "millis")]
    pub poll_interval: Duration,

    /// Wait after a poll that found nothing to claim.
    #[serde(rename = "idle_backoff_millis", with = "millis")]
    pub idle_backoff: Duration,

    /// Age after which an assigned job counts as stalled. This is the
    /// default threshold for [`reap_stale_jobs`](crate::reap_stale_jobs)
    /// when run from the `transit reap` command.
    #[serde(rename = "stale_after_millis", with = "millis")]
    pub stale_after: Duration,

    /// Retry mappings for connector calls.
    pub retry: RetryLibraryConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            idle_backoff: Duration::from_secs(5),
            stale_after: Duration::from_secs(60 * 60),
            retry: RetryLibraryConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or an invalid retry section.
    pub fn from_json(text: &str) -> WorkerResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.retry.build()?;
        Ok(config)
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Sets the idle backoff.
    #[must_use]
    pub const fn idle_backoff(mut self, value: Duration) -> Self {
        self.idle_backoff = value;
        self
    }

    /// Sets the staleness threshold.
    #[must_use]
    pub const fn stale_after(mut self, value: Duration) -> Self {
        self.stale_after = value;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn retry(mut self, value: RetryLibraryConfig) -> Self {
        self.retry = value;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
