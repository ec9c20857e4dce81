//! End-to-end job lifecycle tests: client handoff, worker polling, transfer.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use transit_crypto::{encrypt, WorkerKeyPair};
use transit_retry::{RetryLibraryConfig, RetryMappingConfig, RetryStrategyConfig};
use transit_store::{DurableJobStore, JobId, JobState, JobStore, StoreConfig};
use transit_testkit::{load, memory_store, Page, RecordingImporter, ScriptedExporter, TestStore};
use transit_transfer::{ConnectorError, ConnectorRegistry, PaginationData};
use transit_worker::{
    create_job, reap_stale_jobs, request_worker, submit_auth_data, PollOutcome, WorkerConfig,
    WorkerPollingService,
};

struct Harness {
    store: Arc<dyn JobStore>,
    exporter: Arc<ScriptedExporter>,
    importer: Arc<RecordingImporter>,
    registry: Arc<ConnectorRegistry<Page>>,
}

impl Harness {
    fn new(store: Arc<dyn JobStore>, exporter: ScriptedExporter, importer: RecordingImporter) -> Self {
        let exporter = Arc::new(exporter);
        let importer = Arc::new(importer);
        let registry = Arc::new(
            ConnectorRegistry::<Page>::new()
                .with_exporter("scripted", exporter.clone())
                .with_importer("recording", importer.clone()),
        );
        Self {
            store,
            exporter,
            importer,
            registry,
        }
    }

    fn worker(&self, config: WorkerConfig) -> WorkerPollingService<Page> {
        WorkerPollingService::new(Arc::clone(&self.store), Arc::clone(&self.registry), config)
            .unwrap()
    }

    fn pending_job(&self) -> JobId {
        let job = create_job(self.store.as_ref(), "scripted", "recording", "PHOTOS").unwrap();
        request_worker(self.store.as_ref(), job.id).unwrap();
        job.id
    }
}

fn fast_config() -> WorkerConfig {
    WorkerConfig::new()
        .poll_interval(Duration::ZERO)
        .idle_backoff(Duration::ZERO)
}

#[test]
fn full_lifecycle_completes_job() {
    let harness = Harness::new(
        memory_store(),
        ScriptedExporter::new()
            .then_continue(&["a1", "a2"], "page2")
            .then_end(&["a3"]),
        RecordingImporter::new(),
    );
    let id = harness.pending_job();
    let mut worker = harness.worker(fast_config());

    assert_eq!(worker.poll_once(), PollOutcome::Claimed(id));
    assert_eq!(worker.poll_once(), PollOutcome::AwaitingAuthData(id));

    submit_auth_data(harness.store.as_ref(), id, b"flickr-token", b"google-token").unwrap();
    assert_eq!(worker.poll_once(), PollOutcome::Completed(id));
    assert_eq!(worker.active_job(), None);

    let job = load(harness.store.as_ref(), id);
    assert_eq!(job.state, JobState::Complete);
    assert!(job.failure_reason.is_none());

    assert_eq!(harness.importer.imported(), vec!["a1", "a2", "a3"]);
    assert_eq!(harness.importer.auth_seen()[0], b"google-token".to_vec());

    let calls = harness.exporter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], None);
    assert_eq!(
        calls[1].as_ref().and_then(|i| i.pagination.clone()),
        Some(PaginationData::token("page2"))
    );

    assert_eq!(worker.poll_once(), PollOutcome::Idle);
}

#[test]
fn two_workers_race_exactly_one_claims() {
    let harness = Harness::new(memory_store(), ScriptedExporter::new(), RecordingImporter::new());
    let id = harness.pending_job();

    let contenders = 2;
    let barrier = Arc::new(Barrier::new(contenders));
    let handles: Vec<_> = (0..contenders)
        .map(|_| {
            let mut worker = harness.worker(fast_config());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let outcome = worker.poll_once();
                (outcome, worker.keys().public_key().to_vec())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results
        .iter()
        .filter(|(outcome, _)| *outcome == PollOutcome::Claimed(id))
        .collect();
    assert_eq!(winners.len(), 1);
    for (outcome, _) in &results {
        assert!(matches!(
            outcome,
            PollOutcome::Claimed(_) | PollOutcome::LostRace(_) | PollOutcome::Idle
        ));
    }

    let job = load(harness.store.as_ref(), id);
    assert_eq!(job.state, JobState::AssignedWithoutAuthData);
    assert_eq!(job.worker_public_key.as_ref(), Some(&winners[0].1));
}

#[test]
fn auth_sealed_to_wrong_key_fails_job() {
    let harness = Harness::new(memory_store(), ScriptedExporter::new(), RecordingImporter::new());
    let id = harness.pending_job();
    let mut worker = harness.worker(fast_config());
    worker.poll_once();

    let stranger = WorkerKeyPair::generate();
    let job = load(harness.store.as_ref(), id);
    let forged = job
        .with_encrypted_auth(
            encrypt(b"export", stranger.public_key()).unwrap(),
            encrypt(b"import", stranger.public_key()).unwrap(),
        )
        .with_state(JobState::AssignedWithAuthData);
    harness
        .store
        .update(forged, JobState::AssignedWithoutAuthData)
        .unwrap();

    assert_eq!(worker.poll_once(), PollOutcome::Failed(id));
    let job = load(harness.store.as_ref(), id);
    assert_eq!(job.state, JobState::Error);
    assert!(job.failure_reason.unwrap().contains("crypto"));
    assert_eq!(harness.exporter.call_count(), 0);
}

#[test]
fn item_failures_do_not_fail_job() {
    let harness = Harness::new(
        memory_store(),
        ScriptedExporter::new().then_end(&["ok-1", "broken", "ok-2"]),
        RecordingImporter::new().failing("broken"),
    );
    let id = harness.pending_job();
    let mut worker = harness.worker(fast_config());
    worker.poll_once();
    submit_auth_data(harness.store.as_ref(), id, b"e", b"i").unwrap();

    assert_eq!(worker.poll_once(), PollOutcome::Completed(id));
    assert_eq!(harness.importer.imported(), vec!["ok-1", "ok-2"]);
    assert_eq!(load(harness.store.as_ref(), id).state, JobState::Complete);
}

#[test]
fn exhausted_export_retries_fail_job() {
    let harness = Harness::new(
        memory_store(),
        ScriptedExporter::new()
            .then_fail(ConnectorError::io("503 unavailable"))
            .then_fail(ConnectorError::io("503 unavailable"))
            .then_fail(ConnectorError::io("503 unavailable")),
        RecordingImporter::new(),
    );
    let config = fast_config().retry(RetryLibraryConfig {
        mappings: vec![RetryMappingConfig {
            regexes: vec!["503".into()],
            strategy: RetryStrategyConfig::Uniform {
                max_attempts: 2,
                interval_millis: 0,
            },
        }],
        default_strategy: RetryStrategyConfig::NoRetry,
    });
    let id = harness.pending_job();
    let mut worker = harness.worker(config);
    worker.poll_once();
    submit_auth_data(harness.store.as_ref(), id, b"e", b"i").unwrap();

    assert_eq!(worker.poll_once(), PollOutcome::Failed(id));
    assert_eq!(harness.exporter.call_count(), 3);
    let job = load(harness.store.as_ref(), id);
    assert_eq!(job.state, JobState::Error);
    assert!(job.failure_reason.unwrap().contains("503"));
}

#[test]
fn durable_store_records_completion_across_reopen() {
    let fixture = TestStore::durable();
    let harness = Harness::new(
        fixture.shared(),
        ScriptedExporter::new().then_end(&["x"]),
        RecordingImporter::new(),
    );
    let id = harness.pending_job();
    let mut worker = harness.worker(fast_config());
    worker.poll_once();
    submit_auth_data(harness.store.as_ref(), id, b"e", b"i").unwrap();
    assert_eq!(worker.poll_once(), PollOutcome::Completed(id));

    let path = fixture.path();
    drop(worker);
    drop(harness);
    drop(fixture.store);

    let reopened = DurableJobStore::open_file(&path, StoreConfig::default()).unwrap();
    let job = reopened.find(id).unwrap().unwrap();
    assert_eq!(job.state, JobState::Complete);
    assert!(job.encrypted_export_auth.is_some());
}

#[test]
fn reaped_job_is_released_by_worker() {
    let harness = Harness::new(memory_store(), ScriptedExporter::new(), RecordingImporter::new());
    let id = harness.pending_job();
    let mut worker = harness.worker(fast_config());
    worker.poll_once();
    submit_auth_data(harness.store.as_ref(), id, b"e", b"i").unwrap();

    let later = chrono::Utc::now() + chrono::Duration::hours(2);
    let reaped = reap_stale_jobs(harness.store.as_ref(), Duration::from_secs(60), later).unwrap();
    assert_eq!(reaped, vec![id]);

    assert_eq!(worker.poll_once(), PollOutcome::Failed(id));
    assert_eq!(harness.exporter.call_count(), 0);
    assert_eq!(worker.poll_once(), PollOutcome::Idle);
}
