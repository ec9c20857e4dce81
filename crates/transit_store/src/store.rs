//! Job store trait and the in-memory implementation.

use crate::error::{StoreError, StoreResult};
use crate::job::{Job, JobId, JobState};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Persistent home of job records.
///
/// Every mutation after [`create`](Self::create) goes through
/// [`update`](Self::update), a compare-and-swap on the job's state. This is
/// the single synchronization primitive between the client-facing tier and
/// every worker.
///
/// Implementations must make `update` atomic under concurrent callers: of
/// any number of racing updates naming the same expected state, at most one
/// succeeds.
pub trait JobStore: Send + Sync {
    /// Inserts a new job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the id is taken.
    fn create(&self, job: Job) -> StoreResult<()>;

    /// Looks up a job by id.
    fn find(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// Returns an arbitrary job currently in `state`.
    ///
    /// No ordering is guaranteed.
    fn find_first(&self, state: JobState) -> StoreResult<Option<JobId>>;

    /// Returns every job currently in `state`.
    fn find_all(&self, state: JobState) -> StoreResult<Vec<JobId>>;

    /// Replaces the stored record with `job` if the stored state equals
    /// `expected`.
    ///
    /// Returns the record as stored (with a fresh `updated_at`).
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the job does not exist
    /// - [`StoreError::Conflict`] if the stored state differs from `expected`
    /// - [`StoreError::IllegalTransition`] if the lifecycle forbids the move
    /// - [`StoreError::InvariantViolation`] if the new record is malformed
    fn update(&self, job: Job, expected: JobState) -> StoreResult<Job>;

    /// Deletes a terminal job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids and
    /// [`StoreError::IllegalTransition`] for jobs that are not yet terminal.
    fn remove(&self, id: JobId) -> StoreResult<()>;
}

/// Checks a proposed update against the stored record.
///
/// The state comparison runs first so that a lost race is always reported
/// as [`StoreError::Conflict`], whatever else is wrong with the request.
///
/// # Errors
///
/// See [`JobStore::update`].
pub fn validate_update(current: &Job, next: &Job, expected: JobState) -> StoreResult<()> {
    if current.state != expected {
        return Err(StoreError::conflict(current.id, expected, current.state));
    }

    if next.state != current.state && !current.state.can_transition_to(next.state) {
        return Err(StoreError::IllegalTransition {
            from: current.state,
            to: next.state,
        });
    }

    if current.state.is_terminal() {
        return Err(StoreError::IllegalTransition {
            from: current.state,
            to: next.state,
        });
    }

    let carries_auth =
        next.encrypted_export_auth.is_some() || next.encrypted_import_auth.is_some();
    if carries_auth && next.worker_public_key.is_none() {
        return Err(StoreError::invariant(
            "encrypted auth data requires a worker public key",
        ));
    }

    if next.export_service != current.export_service
        || next.import_service != current.import_service
        || next.data_type != current.data_type
    {
        return Err(StoreError::invariant("job services and data type are immutable"));
    }

    Ok(())
}

/// Prepares a validated record for storage.
pub(crate) fn stamp(current: &Job, mut next: Job) -> Job {
    next.created_at = current.created_at;
    next.updated_at = Utc::now();
    next
}

/// A job store held entirely in memory.
///
/// Construct one explicitly and share it behind an `Arc`; there is no
/// process-wide instance.
///
/// # Thread Safety
///
/// A single `RwLock` guards the map. `update` holds the write lock across
/// the compare and the swap, which makes it atomic.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Returns true if the store holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, mut job: Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists { id: job.id });
        }

        let now = Utc::now();
        job.created_at = now;
        job.updated_at = now;
        tracing::debug!(job_id = %job.id, state = %job.state, "job created");
        jobs.insert(job.id, job);
        Ok(())
    }

    fn find(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().get(&id).cloned())
    }

    fn find_first(&self, state: JobState) -> StoreResult<Option<JobId>> {
        Ok(self
            .jobs
            .read()
            .values()
            .find(|job| job.state == state)
            .map(|job| job.id))
    }

    fn find_all(&self, state: JobState) -> StoreResult<Vec<JobId>> {
        Ok(self
            .jobs
            .read()
            .values()
            .filter(|job| job.state == state)
            .map(|job| job.id)
            .collect())
    }

    fn update(&self, job: Job, expected: JobState) -> StoreResult<Job> {
        let mut jobs = self.jobs.write();
        let current = jobs
            .get(&job.id)
            .ok_or(StoreError::NotFound { id: job.id })?;

        validate_update(current, &job, expected)?;
        let stored = stamp(current, job);

        if stored.state != expected {
            tracing::info!(job_id = %stored.id, from = %expected, to = %stored.state, "job transitioned");
        }
        jobs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn remove(&self, id: JobId) -> StoreResult<()> {
        let mut jobs = self.jobs.write();
        let job = jobs.get(&id).ok_or(StoreError::NotFound { id })?;
        if !job.state.is_terminal() {
            return Err(StoreError::IllegalTransition {
                from: job.state,
                to: job.state,
            });
        }
        jobs.remove(&id);
        Ok(())
    }
}
