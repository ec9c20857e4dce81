//! # Transit Testkit
//!
//! Test utilities for Transit.
//!
//! This crate provides:
//! - Job store fixtures, in memory and on disk
//! - Scripted exporters and recording importers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use transit_testkit::prelude::*;
//! use transit_store::{JobState, JobStore};
//!
//! let store = memory_store();
//! let id = job_in_state(store.as_ref(), JobState::PendingWorkerAssignment, None);
//! assert_eq!(
//!     store.find_first(JobState::PendingWorkerAssignment).unwrap(),
//!     Some(id)
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod connectors;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connectors::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use connectors::*;
pub use fixtures::*;
pub use generators::*;
