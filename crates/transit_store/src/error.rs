//! Error types for job store operations.

use crate::job::{JobId, JobState};
use std::io;
use thiserror::Error;

/// Result type for job store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A job with this id already exists.
    #[error("job already exists: {id}")]
    AlreadyExists {
        /// The duplicate job id.
        id: JobId,
    },

    /// No job with this id exists.
    #[error("job not found: {id}")]
    NotFound {
        /// The missing job id.
        id: JobId,
    },

    /// The persisted state did not match the caller's expected state.
    ///
    /// This is the normal outcome of losing a race and is never retried.
    #[error("state conflict on job {id}: expected {expected}, found {actual}")]
    Conflict {
        /// The job id.
        id: JobId,
        /// State the caller expected.
        expected: JobState,
        /// State actually stored.
        actual: JobState,
    },

    /// The requested transition would move the job backwards or out of a
    /// terminal state.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Current state.
        from: JobState,
        /// Attempted target state.
        to: JobState,
    },

    /// The new record would break a job invariant.
    #[error("job invariant violated: {message}")]
    InvariantViolation {
        /// Description of the violation.
        message: String,
    },

    /// An I/O error occurred in the log backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A job record could not be serialized or deserialized.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The record log is corrupted.
    #[error("record log corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Another process holds the store lock.
    #[error("job store locked: another process has exclusive access")]
    Locked,
}

impl StoreError {
    /// Creates a state conflict error.
    pub fn conflict(id: JobId, expected: JobState, actual: JobState) -> Self {
        Self::Conflict {
            id,
            expected,
            actual,
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Returns true if this error means another caller won a CAS race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_distinguishable() {
        let id = JobId::new();
        let err = StoreError::conflict(
            id,
            JobState::PendingWorkerAssignment,
            JobState::AssignedWithoutAuthData,
        );
        assert!(err.is_conflict());
        assert!(!StoreError::NotFound { id }.is_conflict());
        assert!(!StoreError::invariant("x").is_conflict());
    }

    #[test]
    fn error_display() {
        let err = StoreError::IllegalTransition {
            from: JobState::Complete,
            to: JobState::PendingAuthData,
        };
        assert_eq!(
            err.to_string(),
            "illegal transition from COMPLETE to PENDING_AUTH_DATA"
        );
    }
}
