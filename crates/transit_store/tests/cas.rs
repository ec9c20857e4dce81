//! Concurrency and lifecycle tests for the job stores.

use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use transit_store::{
    DurableJobStore, InMemoryJobStore, Job, JobId, JobState, JobStore, MemoryLog, StoreConfig,
    StoreError,
};

fn pending_assignment(store: &dyn JobStore) -> JobId {
    let job = Job::new("flickr", "google", "PHOTOS");
    let id = job.id;
    store.create(job).unwrap();
    let job = store
        .find(id)
        .unwrap()
        .unwrap()
        .with_state(JobState::PendingWorkerAssignment);
    store.update(job, JobState::PendingAuthData).unwrap();
    id
}

fn race_to_claim(store: Arc<dyn JobStore>, contenders: usize) {
    let id = pending_assignment(store.as_ref());
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|n| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let job = store
                    .find(id)
                    .unwrap()
                    .unwrap()
                    .with_state(JobState::AssignedWithoutAuthData)
                    .with_worker_key(vec![n as u8; 32]);
                barrier.wait();
                store.update(job, JobState::PendingWorkerAssignment)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(err) = result {
            assert!(err.is_conflict(), "unexpected error: {err}");
        }
    }

    let stored = store.find(id).unwrap().unwrap();
    assert_eq!(stored.state, JobState::AssignedWithoutAuthData);
    assert_eq!(stored.worker_public_key, winners[0].worker_public_key);
}

#[test]
fn exactly_one_worker_claims_in_memory() {
    race_to_claim(Arc::new(InMemoryJobStore::new()), 8);
}

#[test]
fn exactly_one_worker_claims_durable() {
    let store = DurableJobStore::open(MemoryLog::new(), StoreConfig::default()).unwrap();
    race_to_claim(Arc::new(store), 8);
}

#[test]
fn two_workers_race_loser_leaves_job_untouched() {
    let store = InMemoryJobStore::new();
    let id = pending_assignment(&store);

    let snapshot = store.find(id).unwrap().unwrap();
    let worker_a = snapshot
        .clone()
        .with_state(JobState::AssignedWithoutAuthData)
        .with_worker_key(vec![0xA; 32]);
    let worker_b = snapshot
        .with_state(JobState::AssignedWithoutAuthData)
        .with_worker_key(vec![0xB; 32]);

    store
        .update(worker_a, JobState::PendingWorkerAssignment)
        .unwrap();
    let after_a = store.find(id).unwrap().unwrap();

    let err = store
        .update(worker_b, JobState::PendingWorkerAssignment)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict {
            expected: JobState::PendingWorkerAssignment,
            actual: JobState::AssignedWithoutAuthData,
            ..
        }
    ));
    assert_eq!(store.find(id).unwrap().unwrap(), after_a);
}

#[test]
fn durable_store_survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.log");

    let id = {
        let store = DurableJobStore::open_file(&path, StoreConfig::default()).unwrap();
        pending_assignment(&store)
    };

    let store = DurableJobStore::open_file(&path, StoreConfig::default()).unwrap();
    assert_eq!(
        store.find_first(JobState::PendingWorkerAssignment).unwrap(),
        Some(id)
    );
}

proptest! {
    /// Whatever sequence of transitions callers attempt, the observed
    /// state sequence never revisits a state.
    #[test]
    fn observed_states_are_monotonic(attempts in prop::collection::vec((0usize..6, 0usize..6), 1..40)) {
        let store = InMemoryJobStore::new();
        let job = Job::new("a", "b", "TASKS");
        let id = job.id;
        store.create(job).unwrap();

        let mut observed = vec![JobState::PendingAuthData];
        for (expected, next) in attempts {
            let expected = JobState::ALL[expected];
            let next = JobState::ALL[next];
            let mut candidate = store.find(id).unwrap().unwrap().with_state(next);
            if next.is_assigned() {
                candidate = candidate.with_worker_key(vec![1; 32]);
            }
            let _ = store.update(candidate, expected);

            let state = store.find(id).unwrap().unwrap().state;
            if *observed.last().unwrap() != state {
                prop_assert!(!observed.contains(&state), "revisited {state}");
                observed.push(state);
            }
        }

        for pair in observed.windows(2) {
            prop_assert!(pair[1].ordinal() > pair[0].ordinal());
        }
    }
}
