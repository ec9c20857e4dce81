//! Force-failing stalled jobs.

use crate::error::WorkerResult;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};
use transit_store::{JobId, JobState, JobStore};

/// Moves every job stuck in an assigned state for longer than `stale_after`
/// to `ERROR`, and returns their ids.
///
/// A job whose state changes while it is being reaped is left alone.
///
/// # Errors
///
/// Returns a store error other than a lost compare-and-swap.
pub fn reap_stale_jobs(
    store: &dyn JobStore,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> WorkerResult<Vec<JobId>> {
    let Ok(threshold) = chrono::Duration::from_std(stale_after) else {
        return Ok(Vec::new());
    };
    let mut reaped = Vec::new();

    for state in [JobState::AssignedWithoutAuthData, JobState::AssignedWithAuthData] {
        for id in store.find_all(state)? {
            let Some(job) = store.find(id)? else {
                continue;
            };
            if job.state != state || now.signed_duration_since(job.updated_at) <= threshold {
                continue;
            }

            let reason = format!(
                "stalled in {state} since {}",
                job.updated_at.to_rfc3339()
            );
            match store.update(job.with_failure(reason).with_state(JobState::Error), state) {
                Ok(_) => {
                    info!(job_id = %id, from = %state, "stale job reaped");
                    reaped.push(id);
                }
                Err(err) if err.is_conflict() => {
                    debug!(job_id = %id, "job moved while reaping");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(reaped)
}
