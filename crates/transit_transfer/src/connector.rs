//! The connector contract and the service registry.

use crate::auth::AuthData;
use crate::continuation::{ExportInformation, ExportResult};
use crate::error::ConnectorError;
use crate::executor::IdempotentImportExecutor;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Produces pages of domain data from a source service.
pub trait Exporter<T>: Send + Sync {
    /// Exports one page.
    ///
    /// `info` is `None` for the first call of a job and otherwise carries a
    /// cursor or container from an earlier result.
    fn export(
        &self,
        job_id: Uuid,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<T>, ConnectorError>;
}

/// What an importer reports for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The page was imported; individual items may still have failed.
    Ok,
    /// The page could not be imported. Fatal to the job.
    Error(String),
}

/// Writes pages of domain data into a destination service.
///
/// Item-level side effects should go through `executor` so that a re-run
/// job does not repeat them.
pub trait Importer<T>: Send + Sync {
    /// Imports one page.
    fn import_item(
        &self,
        job_id: Uuid,
        executor: &IdempotentImportExecutor,
        auth: &AuthData,
        data: T,
    ) -> Result<ImportOutcome, ConnectorError>;
}

/// Exporters and importers by service name, built once at startup.
pub struct ConnectorRegistry<T> {
    exporters: HashMap<String, Arc<dyn Exporter<T>>>,
    importers: HashMap<String, Arc<dyn Importer<T>>>,
}

impl<T> ConnectorRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            exporters: HashMap::new(),
            importers: HashMap::new(),
        }
    }

    /// Registers an exporter. Names are case-insensitive.
    #[must_use]
    pub fn with_exporter(mut self, service: &str, exporter: Arc<dyn Exporter<T>>) -> Self {
        self.exporters.insert(service.to_ascii_lowercase(), exporter);
        self
    }

    /// Registers an importer. Names are case-insensitive.
    #[must_use]
    pub fn with_importer(mut self, service: &str, importer: Arc<dyn Importer<T>>) -> Self {
        self.importers.insert(service.to_ascii_lowercase(), importer);
        self
    }

    /// Looks up the exporter for `service`.
    pub fn exporter(&self, service: &str) -> Option<Arc<dyn Exporter<T>>> {
        self.exporters.get(&service.to_ascii_lowercase()).cloned()
    }

    /// Looks up the importer for `service`.
    pub fn importer(&self, service: &str) -> Option<Arc<dyn Importer<T>>> {
        self.importers.get(&service.to_ascii_lowercase()).cloned()
    }

    /// Returns the registered export service names, sorted.
    pub fn export_services(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.exporters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the registered import service names, sorted.
    pub fn import_services(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.importers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T> Default for ConnectorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ConnectorRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("exporters", &self.export_services())
            .field("importers", &self.import_services())
            .finish()
    }
}
