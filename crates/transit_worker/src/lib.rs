//! # Transit Worker
//!
//! The orchestration tier: the polling service a worker process runs, and
//! the helpers the client-facing tier uses to hand a job over to it.
//!
//! ## Lifecycle
//!
//! ```text
//! PENDING_AUTH_DATA
//!   -> PENDING_WORKER_ASSIGNMENT     request_worker
//!   -> ASSIGNED_WITHOUT_AUTH_DATA    worker claims, publishes its key
//!   -> ASSIGNED_WITH_AUTH_DATA       submit_auth_data seals credentials
//!   -> COMPLETE | ERROR              worker runs the transfer
//! ```
//!
//! Every arrow is a compare-and-swap on the job store. Two workers polling
//! the same store cannot both claim a job; the loser sees
//! [`PollOutcome::LostRace`] and moves on.
//!
//! A worker that crashes mid-transfer leaves its job in
//! `ASSIGNED_WITH_AUTH_DATA`. [`reap_stale_jobs`] moves such jobs to
//! `ERROR` once they exceed a staleness threshold.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handoff;
mod poller;
mod reaper;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use handoff::{create_job, request_worker, submit_auth_data};
pub use poller::{PollOutcome, WorkerPollingService};
pub use reaper::reap_stale_jobs;
