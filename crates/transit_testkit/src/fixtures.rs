//! Job store fixtures.

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use transit_store::{
    DurableJobStore, FileLog, InMemoryJobStore, Job, JobId, JobState, JobStore, StoreConfig,
};

/// Returns an empty in-memory store behind the trait object the worker
/// tier expects.
pub fn memory_store() -> Arc<dyn JobStore> {
    Arc::new(InMemoryJobStore::new())
}

/// A durable store in a temporary directory, removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: Arc<DurableJobStore<FileLog>>,
    temp_dir: TempDir,
}

impl TestStore {
    /// Opens a fresh durable store.
    pub fn durable() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("jobs.log");
        let store = DurableJobStore::open_file(&path, StoreConfig::default())
            .expect("Failed to open durable store");
        Self {
            store: Arc::new(store),
            temp_dir,
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("jobs.log")
    }

    /// Returns the store as a trait object.
    pub fn shared(&self) -> Arc<dyn JobStore> {
        self.store.clone()
    }
}

/// Forward path through the lifecycle, excluding the terminal states.
const FORWARD: [JobState; 4] = [
    JobState::PendingAuthData,
    JobState::PendingWorkerAssignment,
    JobState::AssignedWithoutAuthData,
    JobState::AssignedWithAuthData,
];

/// Creates a job and walks it forward to `state` through legal updates.
///
/// Assigned states carry `worker_key`, or 32 bytes of `0x01` if none is
/// given. `COMPLETE` and `ERROR` are reached from
/// `ASSIGNED_WITH_AUTH_DATA`.
pub fn job_in_state(store: &dyn JobStore, state: JobState, worker_key: Option<Vec<u8>>) -> JobId {
    let job = Job::new("source", "destination", "PHOTOS");
    let id = job.id;
    store.create(job).expect("Failed to create job");

    let key = worker_key.unwrap_or_else(|| vec![1; 32]);
    let target = FORWARD.iter().position(|s| *s == state).unwrap_or(FORWARD.len() - 1);
    for pair in FORWARD[..=target].windows(2) {
        advance(store, id, pair[0], pair[1], &key);
    }
    if state.is_terminal() {
        advance(store, id, JobState::AssignedWithAuthData, state, &key);
    }
    id
}

fn advance(store: &dyn JobStore, id: JobId, from: JobState, to: JobState, key: &[u8]) {
    let mut job = store
        .find(id)
        .expect("Failed to read job")
        .expect("Job vanished")
        .with_state(to);
    if to.is_assigned() {
        job = job.with_worker_key(key.to_vec());
    }
    store.update(job, from).expect("Failed to advance job");
}

/// Reads a job that must exist.
pub fn load(store: &dyn JobStore, id: JobId) -> Job {
    store
        .find(id)
        .expect("Failed to read job")
        .expect("Job not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_to_every_state() {
        let store = memory_store();
        for state in JobState::ALL {
            let id = job_in_state(store.as_ref(), state, None);
            assert_eq!(load(store.as_ref(), id).state, state);
        }
    }

    #[test]
    fn durable_fixture_persists() {
        let fixture = TestStore::durable();
        let id = job_in_state(fixture.store.as_ref(), JobState::PendingWorkerAssignment, None);
        assert!(fixture.path().exists());
        assert_eq!(load(fixture.shared().as_ref(), id).state, JobState::PendingWorkerAssignment);
    }
}
