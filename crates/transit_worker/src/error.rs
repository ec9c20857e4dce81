//! Error types for the worker tier.

use thiserror::Error;
use transit_crypto::CryptoError;
use transit_retry::RetryConfigError;
use transit_store::{JobId, StoreError};
use transit_transfer::TransferError;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors raised by the worker and the handoff helpers.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Job store failure, including a lost compare-and-swap.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Auth data could not be sealed or opened.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The transfer itself failed.
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// No connector is registered for a service.
    #[error("no {role} connector registered for service {service:?}")]
    UnknownService {
        /// `export` or `import`.
        role: &'static str,
        /// The service name from the job.
        service: String,
    },

    /// The job is not in a shape this operation accepts.
    #[error("job {id} cannot be processed: {message}")]
    InvalidAssignment {
        /// The job id.
        id: JobId,
        /// Description of the problem.
        message: String,
    },

    /// The job does not exist.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Worker configuration could not be parsed.
    #[error("invalid worker configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The retry section of the configuration is invalid.
    #[error("invalid retry configuration: {0}")]
    RetryConfig(#[from] RetryConfigError),
}

impl WorkerError {
    /// Creates an invalid assignment error.
    pub fn invalid_assignment(id: JobId, message: impl Into<String>) -> Self {
        Self::InvalidAssignment {
            id,
            message: message.into(),
        }
    }

    /// Returns true if this is a lost compare-and-swap.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_conflict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_store::JobState;

    #[test]
    fn conflict_is_detected_through_wrapper() {
        let id = JobId::new();
        let err: WorkerError =
            StoreError::conflict(id, JobState::PendingWorkerAssignment, JobState::Complete).into();
        assert!(err.is_conflict());
        assert!(!WorkerError::NotFound(id).is_conflict());
    }
}
