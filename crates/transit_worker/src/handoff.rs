//! The client-facing half of the credential handoff.
//!
//! ```text
//! create_job        -> PENDING_AUTH_DATA
//! request_worker    -> PENDING_WORKER_ASSIGNMENT
//! (worker claims)   -> ASSIGNED_WITHOUT_AUTH_DATA, public key published
//! submit_auth_data  -> ASSIGNED_WITH_AUTH_DATA, blobs sealed to that key
//! ```
//!
//! Plaintext credentials never reach the store: they are sealed to the
//! published worker key before the update is issued.

use crate::error::{WorkerError, WorkerResult};
use tracing::info;
use transit_crypto::{encrypt, PublicKey};
use transit_store::{Job, JobId, JobState, JobStore};

/// Creates a job in `PENDING_AUTH_DATA`.
///
/// # Errors
///
/// Returns a store error if the job cannot be persisted.
pub fn create_job(
    store: &dyn JobStore,
    export_service: &str,
    import_service: &str,
    data_type: &str,
) -> WorkerResult<Job> {
    let job = Job::new(export_service, import_service, data_type);
    let id = job.id;
    store.create(job)?;
    info!(job_id = %id, export_service, import_service, data_type, "job created");
    store.find(id)?.ok_or(WorkerError::NotFound(id))
}

/// Marks a job ready for a worker once credentials have been collected.
///
/// # Errors
///
/// Fails with a conflict if the job is no longer in `PENDING_AUTH_DATA`.
pub fn request_worker(store: &dyn JobStore, id: JobId) -> WorkerResult<Job> {
    let job = store.find(id)?.ok_or(WorkerError::NotFound(id))?;
    let updated = store.update(
        job.with_state(JobState::PendingWorkerAssignment),
        JobState::PendingAuthData,
    )?;
    info!(job_id = %id, state = %updated.state, "worker requested");
    Ok(updated)
}

/// Seals both credentials to the assigned worker's key and hands them over.
///
/// # Errors
///
/// Fails if the job has no assigned worker yet, the published key is
/// malformed, or the job moved on concurrently.
pub fn submit_auth_data(
    store: &dyn JobStore,
    id: JobId,
    export_auth: &[u8],
    import_auth: &[u8],
) -> WorkerResult<Job> {
    let job = store.find(id)?.ok_or(WorkerError::NotFound(id))?;
    if job.state != JobState::AssignedWithoutAuthData {
        return Err(WorkerError::invalid_assignment(
            id,
            format!("expected {}, found {}", JobState::AssignedWithoutAuthData, job.state),
        ));
    }
    let key_bytes = job
        .worker_public_key
        .as_deref()
        .ok_or_else(|| WorkerError::invalid_assignment(id, "no worker public key"))?;
    let worker_key = PublicKey::from_bytes(key_bytes)?;

    let sealed_export = encrypt(export_auth, &worker_key)?;
    let sealed_import = encrypt(import_auth, &worker_key)?;

    let updated = store.update(
        job.with_encrypted_auth(sealed_export, sealed_import)
            .with_state(JobState::AssignedWithAuthData),
        JobState::AssignedWithoutAuthData,
    )?;
    info!(job_id = %id, state = %updated.state, "auth data submitted");
    Ok(updated)
}
