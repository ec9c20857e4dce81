//! Log-backed durable job store.

use crate::backend::LogBackend;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::file::FileLog;
use crate::job::{Job, JobId, JobState};
use crate::record::LogRecord;
use crate::store::{stamp, validate_update, JobStore};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;

/// A job store that keeps an in-memory index over an append-only log.
///
/// Every accepted write appends a frame holding the job's full record; the
/// index is rebuilt by replaying the log on open. [`compact`](Self::compact)
/// rewrites the log with one frame per live job.
///
/// # Atomicity
///
/// `update` holds the index write lock across validation, the log append
/// and the index swap. If the append or its sync fails, the log is
/// truncated back to its previous length and the index is left untouched,
/// so a write reported as failed never reappears on replay. Once a frame
/// is durable the write is committed; a failed automatic compaction after
/// that point is logged and retried on the next write.
pub struct DurableJobStore<B: LogBackend> {
    jobs: RwLock<HashMap<JobId, Job>>,
    log: Mutex<LogState<B>>,
    config: StoreConfig,
}

struct LogState<B> {
    backend: B,
    frames_since_compaction: u64,
}

impl DurableJobStore<FileLog> {
    /// Opens (or creates) a durable store backed by the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is locked, unreadable or corrupted.
    pub fn open_file(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        Self::open(FileLog::open(path)?, config)
    }
}

impl<B: LogBackend> DurableJobStore<B> {
    /// Opens a store over `backend`, replaying any existing records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if a complete frame fails its
    /// checksum, or an I/O error from the backend.
    pub fn open(mut backend: B, config: StoreConfig) -> StoreResult<Self> {
        let bytes = backend.read_all()?;
        let (records, consumed) = LogRecord::decode_all(&bytes)?;
        let frame_count = records.len() as u64;

        let mut jobs = HashMap::new();
        for record in records {
            match record {
                LogRecord::Put(job) => {
                    jobs.insert(job.id, job);
                }
                LogRecord::Remove(id) => {
                    jobs.remove(&id);
                }
            }
        }

        if consumed < bytes.len() {
            // Drop the torn tail so the next append starts on a frame boundary.
            let live = Self::encode_live(&jobs)?;
            backend.replace(&live)?;
        }

        tracing::info!(jobs = jobs.len(), frames = frame_count, "job store opened");

        Ok(Self {
            jobs: RwLock::new(jobs),
            log: Mutex::new(LogState {
                backend,
                frames_since_compaction: frame_count,
            }),
            config,
        })
    }

    /// Returns the number of live jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Returns true if the store holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Returns every live job.
    #[must_use]
    pub fn all_jobs(&self) -> Vec<Job> {
        self.jobs.read().values().cloned().collect()
    }

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn log_size(&self) -> StoreResult<u64> {
        self.log.lock().backend.size()
    }

    /// Rewrites the log with a single frame per live job.
    ///
    /// # Errors
    ///
    /// Returns an error if the new log cannot be written.
    pub fn compact(&self) -> StoreResult<()> {
        let jobs = self.jobs.write();
        let mut log = self.log.lock();
        self.compact_locked(&jobs, &mut log)
    }

    fn compact_locked(&self, jobs: &HashMap<JobId, Job>, log: &mut LogState<B>) -> StoreResult<()> {
        let before = log.backend.size()?;
        let live = Self::encode_live(jobs)?;
        log.backend.replace(&live)?;
        log.frames_since_compaction = 0;
        tracing::info!(before, after = live.len(), jobs = jobs.len(), "job log compacted");
        Ok(())
    }

    fn encode_live(jobs: &HashMap<JobId, Job>) -> StoreResult<Vec<u8>> {
        let mut out = Vec::new();
        for job in jobs.values() {
            out.extend(LogRecord::Put(job.clone()).encode()?);
        }
        Ok(out)
    }

    fn write_record(&self, jobs: &HashMap<JobId, Job>, record: &LogRecord) -> StoreResult<()> {
        let frame = record.encode()?;
        let mut log = self.log.lock();
        let committed = log.backend.size()?;

        if let Err(err) = Self::append_frame(&mut log.backend, &frame, self.config.sync_on_write) {
            if let Err(rollback) = log.backend.truncate(committed) {
                tracing::error!(error = %rollback, committed, "failed to roll back log write");
            }
            return Err(err);
        }
        log.frames_since_compaction += 1;

        if let Some(threshold) = self.config.compact_after {
            if log.frames_since_compaction >= threshold {
                // `jobs` does not yet reflect `record`; replay it into a copy.
                let mut live = jobs.clone();
                match record {
                    LogRecord::Put(job) => {
                        live.insert(job.id, job.clone());
                    }
                    LogRecord::Remove(id) => {
                        live.remove(id);
                    }
                }
                if let Err(err) = self.compact_locked(&live, &mut log) {
                    tracing::warn!(error = %err, "automatic compaction failed");
                }
            }
        }
        Ok(())
    }

    fn append_frame(backend: &mut B, frame: &[u8], sync: bool) -> StoreResult<()> {
        backend.append(frame)?;
        if sync {
            backend.sync()?;
        }
        Ok(())
    }
}

impl<B: LogBackend> JobStore for DurableJobStore<B> {
    fn create(&self, mut job: Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists { id: job.id });
        }

        let now = Utc::now();
        job.created_at = now;
        job.updated_at = now;

        let record = LogRecord::Put(job);
        self.write_record(&jobs, &record)?;
        if let LogRecord::Put(job) = record {
            tracing::debug!(job_id = %job.id, state = %job.state, "job created");
            jobs.insert(job.id, job);
        }
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

        let record = LogRecord::Put(stored.clone());
        self.write_record(&jobs, &record)?;

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

        self.write_record(&jobs, &LogRecord::Remove(id))?;
        jobs.remove(&id);
        Ok(())
    }
}

impl<B: LogBackend> std::fmt::Debug for DurableJobStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableJobStore")
            .field("jobs", &self.jobs.read().len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// A memory log whose sync or replace can be made to fail.
    #[derive(Clone, Default)]
    struct FlakyLog {
        inner: MemoryLog,
        fail_sync: Arc<AtomicBool>,
        fail_replace: Arc<AtomicBool>,
    }

    impl LogBackend for FlakyLog {
        fn read_all(&self) -> StoreResult<Vec<u8>> {
            self.inner.read_all()
        }

        fn append(&mut self, data: &[u8]) -> StoreResult<u64> {
            self.inner.append(data)
        }

        fn sync(&mut self) -> StoreResult<()> {
            if self.fail_sync.load(Ordering::SeqCst) {
                return Err(io::Error::other("fsync failed").into());
            }
            self.inner.sync()
        }

        fn size(&self) -> StoreResult<u64> {
            self.inner.size()
        }

        fn truncate(&mut self, len: u64) -> StoreResult<()> {
            self.inner.truncate(len)
        }

        fn replace(&mut self, data: &[u8]) -> StoreResult<()> {
            if self.fail_replace.load(Ordering::SeqCst) {
                return Err(io::Error::other("rename failed").into());
            }
            self.inner.replace(data)
        }
    }

    fn open(log: &MemoryLog) -> DurableJobStore<MemoryLog> {
        DurableJobStore::open(log.clone(), StoreConfig::default()).unwrap()
    }

    fn created(store: &DurableJobStore<MemoryLog>) -> JobId {
        let job = Job::new("google", "microsoft", "CALENDAR");
        let id = job.id;
        store.create(job).unwrap();
        id
    }

    #[test]
    fn replay_restores_latest_record() {
        let log = MemoryLog::new();
        let id = {
            let store = open(&log);
            let id = created(&store);
            let job = store
                .find(id)
                .unwrap()
                .unwrap()
                .with_state(JobState::PendingWorkerAssignment);
            store.update(job, JobState::PendingAuthData).unwrap();
            id
        };

        let reopened = open(&log);
        let job = reopened.find(id).unwrap().unwrap();
        assert_eq!(job.state, JobState::PendingWorkerAssignment);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn replay_honors_removals() {
        let log = MemoryLog::new();
        let id = {
            let store = open(&log);
            let id = created(&store);
            let job = store.find(id).unwrap().unwrap().with_state(JobState::Error);
            store.update(job, JobState::PendingAuthData).unwrap();
            store.remove(id).unwrap();
            id
        };

        let reopened = open(&log);
        assert!(reopened.find(id).unwrap().is_none());
        assert!(reopened.is_empty());
    }

    #[test]
    fn failed_update_appends_nothing() {
        let log = MemoryLog::new();
        let store = open(&log);
        let id = created(&store);
        let size = store.log_size().unwrap();

        let job = store.find(id).unwrap().unwrap().with_state(JobState::Complete);
        assert!(store.update(job, JobState::PendingAuthData).is_err());
        assert_eq!(store.log_size().unwrap(), size);
    }

    #[test]
    fn compaction_shrinks_log() {
        let log = MemoryLog::new();
        let store = open(&log);
        let id = created(&store);

        let mut state = JobState::PendingAuthData;
        for next in [
            JobState::PendingWorkerAssignment,
            JobState::AssignedWithoutAuthData,
        ] {
            let job = store.find(id).unwrap().unwrap().with_state(next);
            store.update(job, state).unwrap();
            state = next;
        }

        let before = store.log_size().unwrap();
        store.compact().unwrap();
        assert!(store.log_size().unwrap() < before);

        let reopened = open(&log);
        assert_eq!(
            reopened.find(id).unwrap().unwrap().state,
            JobState::AssignedWithoutAuthData
        );
    }

    #[test]
    fn automatic_compaction() {
        let log = MemoryLog::new();
        let store =
            DurableJobStore::open(log.clone(), StoreConfig::new().compact_after(3)).unwrap();
        let ids: Vec<_> = (0..3).map(|_| created(&store)).collect();

        // The third append triggers compaction down to one frame per job.
        let (records, _) = LogRecord::decode_all(&log.data()).unwrap();
        assert_eq!(records.len(), 3);

        let reopened = open(&log);
        for id in ids {
            assert!(reopened.find(id).unwrap().is_some());
        }
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let log = MemoryLog::new();
        let id = {
            let store = open(&log);
            created(&store)
        };

        let mut bytes = log.data();
        let orphan = LogRecord::Put(Job::new("x", "y", "TASKS")).encode().unwrap();
        bytes.extend_from_slice(&orphan[..orphan.len() / 2]);
        let torn = MemoryLog::with_data(bytes);

        let store = open(&torn);
        assert_eq!(store.len(), 1);
        assert!(store.find(id).unwrap().is_some());

        let (_, consumed) = LogRecord::decode_all(&torn.data()).unwrap();
        assert_eq!(consumed, torn.data().len());
    }

    #[test]
    fn corrupted_log_fails_to_open() {
        let log = MemoryLog::new();
        {
            let store = open(&log);
            created(&store);
        }
        let mut bytes = log.data();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let result = DurableJobStore::open(MemoryLog::with_data(bytes), StoreConfig::default());
        assert!(matches!(result, Err(StoreError::Corrupted { .. })));
    }

    #[test]
    fn failed_sync_rolls_back_the_frame() {
        let flaky = FlakyLog::default();
        let store = DurableJobStore::open(flaky.clone(), StoreConfig::default()).unwrap();
        let job = Job::new("google", "microsoft", "CALENDAR")
            .with_state(JobState::PendingWorkerAssignment);
        let id = job.id;
        store.create(job).unwrap();
        let size = store.log_size().unwrap();

        flaky.fail_sync.store(true, Ordering::SeqCst);
        let claim = store
            .find(id)
            .unwrap()
            .unwrap()
            .with_state(JobState::AssignedWithoutAuthData)
            .with_worker_key(vec![9; 32]);
        let result = store.update(claim.clone(), JobState::PendingWorkerAssignment);
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(store.log_size().unwrap(), size);
        assert_eq!(
            store.find(id).unwrap().unwrap().state,
            JobState::PendingWorkerAssignment
        );

        let reopened = open(&flaky.inner);
        let job = reopened.find(id).unwrap().unwrap();
        assert_eq!(job.state, JobState::PendingWorkerAssignment);
        assert!(job.worker_public_key.is_none());

        flaky.fail_sync.store(false, Ordering::SeqCst);
        store.update(claim, JobState::PendingWorkerAssignment).unwrap();
        assert_eq!(
            open(&flaky.inner).find(id).unwrap().unwrap().state,
            JobState::AssignedWithoutAuthData
        );
    }

    #[test]
    fn failed_create_is_not_replayed() {
        let flaky = FlakyLog::default();
        let store = DurableJobStore::open(flaky.clone(), StoreConfig::default()).unwrap();

        flaky.fail_sync.store(true, Ordering::SeqCst);
        let job = Job::new("google", "microsoft", "CALENDAR");
        let id = job.id;
        assert!(store.create(job).is_err());
        assert!(store.is_empty());
        assert!(flaky.inner.data().is_empty());
        assert!(open(&flaky.inner).find(id).unwrap().is_none());
    }

    #[test]
    fn failed_auto_compaction_keeps_committed_write() {
        let flaky = FlakyLog::default();
        let store =
            DurableJobStore::open(flaky.clone(), StoreConfig::new().compact_after(1)).unwrap();

        flaky.fail_replace.store(true, Ordering::SeqCst);
        let job = Job::new("google", "microsoft", "CALENDAR");
        let id = job.id;
        store.create(job).unwrap();

        assert!(store.find(id).unwrap().is_some());
        assert!(open(&flaky.inner).find(id).unwrap().is_some());
    }
}
