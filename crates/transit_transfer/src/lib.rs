//! # Transit Transfer
//!
//! The part of a job that actually moves data: a paged export/import loop
//! driven through the connector contract.
//!
//! - [`Exporter`] returns one [`ExportResult`] page per call. `Continue`
//!   results carry [`ContinuationData`] that the loop hands back unchanged.
//! - [`Importer`] consumes a page and routes item-level side effects
//!   through an [`IdempotentImportExecutor`], so re-running a job never
//!   repeats an item that already succeeded.
//! - [`Transfer`] ties the two together, retrying export calls through a
//!   [`transit_retry::RetryStrategyLibrary`].
//!
//! ## Key Invariants
//!
//! - A successful item key is executed at most once per executor.
//! - Recoverable item failures are recorded, never propagated.
//! - Only cursors are held between pages, never payloads.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use transit_transfer::{
//!     AuthData, ConnectorError, ExportInformation, ExportResult, Exporter,
//!     IdempotentImportExecutor, ImportOutcome, Importer, Transfer,
//! };
//! use uuid::Uuid;
//!
//! struct OnePage;
//!
//! impl Exporter<Vec<u32>> for OnePage {
//!     fn export(
//!         &self,
//!         _job_id: Uuid,
//!         _auth: &AuthData,
//!         _info: Option<&ExportInformation>,
//!     ) -> Result<ExportResult<Vec<u32>>, ConnectorError> {
//!         Ok(ExportResult::end(vec![1, 2, 3]))
//!     }
//! }
//!
//! struct Sink;
//!
//! impl Importer<Vec<u32>> for Sink {
//!     fn import_item(
//!         &self,
//!         _job_id: Uuid,
//!         executor: &IdempotentImportExecutor,
//!         _auth: &AuthData,
//!         data: Vec<u32>,
//!     ) -> Result<ImportOutcome, ConnectorError> {
//!         for n in data {
//!             executor.execute_and_swallow(&n.to_string(), "number", || Ok(n))?;
//!         }
//!         Ok(ImportOutcome::Ok)
//!     }
//! }
//!
//! let transfer = Transfer::<Vec<u32>>::new(Arc::new(OnePage), Arc::new(Sink));
//! let auth = AuthData::from("token");
//! let summary = transfer.run(Uuid::new_v4(), &auth, &auth).unwrap();
//! assert_eq!(summary.items_imported, 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod connector;
mod continuation;
mod error;
mod executor;
mod transfer;

pub use auth::AuthData;
pub use connector::{ConnectorRegistry, Exporter, ImportOutcome, Importer};
pub use continuation::{
    ContainerResource, ContinuationData, ExportInformation, ExportResult, PaginationData,
    ResultType,
};
pub use error::{ConnectorError, TransferError, TransferResult};
pub use executor::{item_key, ErrorDetail, IdempotentImportExecutor, ItemImportResult};
pub use transfer::{Transfer, TransferSummary};
