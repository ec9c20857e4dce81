//! # Transit Store
//!
//! Job records, the job lifecycle state machine and the job stores that
//! persist them.
//!
//! The store is the only synchronization point between the client-facing
//! tier and the worker fleet. Every transition is an [`JobStore::update`]
//! call carrying the state the caller believes the job is in; the store
//! swaps the record only if that belief is still true.
//!
//! ## Key Invariants
//!
//! - States only move forward (see [`JobState::can_transition_to`])
//! - A stale expected state fails with [`StoreError::Conflict`] and leaves
//!   the stored record untouched
//! - Encrypted auth data is never stored without a worker public key
//!
//! ## Available Stores
//!
//! - [`InMemoryJobStore`] - For tests and single-process deployments
//! - [`DurableJobStore`] - In-memory index over an append-only record log
//!
//! ## Example
//!
//! ```rust
//! use transit_store::{InMemoryJobStore, Job, JobState, JobStore};
//!
//! let store = InMemoryJobStore::new();
//! let job = Job::new("flickr", "google", "PHOTOS");
//! let id = job.id;
//! store.create(job).unwrap();
//!
//! let pending = store.find(id).unwrap().unwrap();
//! store
//!     .update(pending.with_state(JobState::PendingWorkerAssignment), JobState::PendingAuthData)
//!     .unwrap();
//! assert_eq!(store.find_first(JobState::PendingWorkerAssignment).unwrap(), Some(id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod durable;
mod error;
mod file;
mod job;
mod memory;
mod record;
mod store;

pub use backend::LogBackend;
pub use config::StoreConfig;
pub use durable::DurableJobStore;
pub use error::{StoreError, StoreResult};
pub use file::FileLog;
pub use job::{Job, JobId, JobState};
pub use memory::MemoryLog;
pub use record::{compute_crc32, LogRecord};
pub use store::{validate_update, InMemoryJobStore, JobStore};
