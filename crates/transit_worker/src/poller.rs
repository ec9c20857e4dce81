//! The worker polling loop.

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use transit_crypto::{decrypt, WorkerKeyPair};
use transit_retry::{RetryStrategyLibrary, Sleeper, ThreadSleeper};
use transit_store::{Job, JobId, JobState, JobStore, StoreError};
use transit_transfer::{AuthData, ConnectorRegistry, Transfer, TransferSummary};

/// What one call to [`WorkerPollingService::poll_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing to claim.
    Idle,
    /// Another worker claimed the job first.
    LostRace(JobId),
    /// This worker claimed the job and published its key.
    Claimed(JobId),
    /// The held job has no auth data yet.
    AwaitingAuthData(JobId),
    /// The held job finished and was marked `COMPLETE`.
    Completed(JobId),
    /// The held job failed and was marked `ERROR`, or was taken away.
    Failed(JobId),
}

/// Drives one worker through the job state machine.
///
/// A service holds at most one job at a time. It claims work with a
/// compare-and-swap from `PENDING_WORKER_ASSIGNMENT`, waits for the client
/// tier to seal auth data to its key, runs the transfer and records the
/// result. Losing a race is a normal outcome. No error escapes
/// [`poll_once`](Self::poll_once).
pub struct WorkerPollingService<T> {
    store: Arc<dyn JobStore>,
    keys: WorkerKeyPair,
    registry: Arc<ConnectorRegistry<T>>,
    retry: Arc<RetryStrategyLibrary>,
    sleeper: Arc<dyn Sleeper>,
    config: WorkerConfig,
    active: Option<JobId>,
}

impl<T> WorkerPollingService<T> {
    /// Creates a service with a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the retry section of `config` does not compile.
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<ConnectorRegistry<T>>,
        config: WorkerConfig,
    ) -> WorkerResult<Self> {
        let retry = Arc::new(config.retry.build()?);
        let keys = WorkerKeyPair::generate();
        info!(instance_id = %keys.instance_id(), "worker started");
        Ok(Self {
            store,
            keys,
            registry,
            retry,
            sleeper: Arc::new(ThreadSleeper),
            config,
            active: None,
        })
    }

    /// Replaces the sleeper used by [`run`](Self::run) and by retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the worker key pair.
    pub fn keys(&self) -> &WorkerKeyPair {
        &self.keys
    }

    /// Returns the job this worker currently holds.
    pub fn active_job(&self) -> Option<JobId> {
        self.active
    }

    /// Polls until `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            let wait = match self.poll_once() {
                PollOutcome::Idle | PollOutcome::LostRace(_) => self.config.idle_backoff,
                _ => self.config.poll_interval,
            };
            if stop.load(Ordering::Acquire) {
                break;
            }
            self.sleeper.sleep(wait);
        }
        info!(instance_id = %self.keys.instance_id(), "worker stopped");
    }

    /// Runs one iteration of the loop.
    pub fn poll_once(&mut self) -> PollOutcome {
        match self.active {
            None => self.try_claim(),
            Some(id) => self.check_assigned(id),
        }
    }

    fn try_claim(&mut self) -> PollOutcome {
        let id = match self.store.find_first(JobState::PendingWorkerAssignment) {
            Ok(Some(id)) => id,
            Ok(None) => return PollOutcome::Idle,
            Err(err) => {
                warn!(error = %err, "failed to look for work");
                return PollOutcome::Idle;
            }
        };

        let job = match self.store.find(id) {
            Ok(Some(job)) => job,
            Ok(None) => return PollOutcome::LostRace(id),
            Err(err) => {
                warn!(job_id = %id, error = %err, "failed to read job");
                return PollOutcome::Idle;
            }
        };

        let claim = job
            .with_state(JobState::AssignedWithoutAuthData)
            .with_worker_key(self.keys.public_key().to_vec());
        match self.store.update(claim, JobState::PendingWorkerAssignment) {
            Ok(_) => {
                info!(
                    job_id = %id,
                    instance_id = %self.keys.instance_id(),
                    state = %JobState::AssignedWithoutAuthData,
                    "job claimed"
                );
                self.active = Some(id);
                PollOutcome::Claimed(id)
            }
            Err(StoreError::Conflict { actual, .. }) => {
                debug!(job_id = %id, actual = %actual, "lost claim race");
                PollOutcome::LostRace(id)
            }
            Err(StoreError::NotFound { .. }) => PollOutcome::LostRace(id),
            Err(err) => {
                error!(job_id = %id, error = %err, "claim failed");
                PollOutcome::Idle
            }
        }
    }

    fn check_assigned(&mut self, id: JobId) -> PollOutcome {
        let job = match self.store.find(id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %id, "held job disappeared");
                self.active = None;
                return PollOutcome::Failed(id);
            }
            Err(err) => {
                warn!(job_id = %id, error = %err, "failed to re-read held job");
                return PollOutcome::AwaitingAuthData(id);
            }
        };

        if job.worker_public_key.as_deref() != Some(&self.keys.public_key().as_bytes()[..]) {
            warn!(job_id = %id, "held job is assigned to another key");
            self.active = None;
            return PollOutcome::Failed(id);
        }

        match job.state {
            JobState::AssignedWithoutAuthData => PollOutcome::AwaitingAuthData(id),
            JobState::AssignedWithAuthData => {
                let outcome = self.process(job);
                self.active = None;
                outcome
            }
            state => {
                warn!(job_id = %id, state = %state, "held job moved on without this worker");
                self.active = None;
                PollOutcome::Failed(id)
            }
        }
    }

    /// Runs the transfer and records the terminal state.
    fn process(&self, job: Job) -> PollOutcome {
        let id = job.id;
        info!(job_id = %id, export = %job.export_service, import = %job.import_service, "transfer started");

        let (next, outcome) = match self.transfer(&job) {
            Ok(summary) => {
                for item in &summary.item_errors {
                    warn!(job_id = %id, item_key = %item.key, error = %item.message, "item skipped");
                }
                (job.with_state(JobState::Complete), PollOutcome::Completed(id))
            }
            Err(err) => {
                error!(job_id = %id, error = %err, "job failed");
                (
                    job.with_failure(err.to_string()).with_state(JobState::Error),
                    PollOutcome::Failed(id),
                )
            }
        };

        let state = next.state;
        match self.store.update(next, JobState::AssignedWithAuthData) {
            Ok(_) => info!(job_id = %id, state = %state, "job finished"),
            Err(err) if err.is_conflict() => {
                warn!(job_id = %id, error = %err, "job changed during transfer");
            }
            Err(err) => error!(job_id = %id, error = %err, "failed to record job result"),
        }
        outcome
    }

    fn transfer(&self, job: &Job) -> WorkerResult<TransferSummary> {
        let exporter =
            self.registry
                .exporter(&job.export_service)
                .ok_or_else(|| WorkerError::UnknownService {
                    role: "export",
                    service: job.export_service.clone(),
                })?;
        let importer =
            self.registry
                .importer(&job.import_service)
                .ok_or_else(|| WorkerError::UnknownService {
                    role: "import",
                    service: job.import_service.clone(),
                })?;

        let export_auth = self.open(job, job.encrypted_export_auth.as_deref())?;
        let import_auth = self.open(job, job.encrypted_import_auth.as_deref())?;

        let summary = Transfer::new(exporter, importer)
            .with_retry_library(Arc::clone(&self.retry))
            .with_sleeper(Arc::clone(&self.sleeper))
            .run(*job.id.as_uuid(), &export_auth, &import_auth)?;
        Ok(summary)
    }

    fn open(&self, job: &Job, sealed: Option<&[u8]>) -> WorkerResult<AuthData> {
        let sealed =
            sealed.ok_or_else(|| WorkerError::invalid_assignment(job.id, "missing auth data"))?;
        Ok(AuthData::new(decrypt(sealed, self.keys.secret_key())?))
    }
}

impl<T> std::fmt::Debug for WorkerPollingService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPollingService")
            .field("instance_id", &self.keys.instance_id())
            .field("active", &self.active)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
