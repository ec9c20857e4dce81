//! Stub connectors.
//!
//! Pages are `Vec<String>`: each string is one item id.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use transit_transfer::{
    AuthData, ConnectorError, ContinuationData, ExportInformation, ExportResult, Exporter,
    IdempotentImportExecutor, ImportOutcome, Importer, PaginationData,
};
use uuid::Uuid;

/// A page of item ids.
pub type Page = Vec<String>;

type ScriptedResult = Result<ExportResult<Page>, ConnectorError>;

/// An exporter that replays a fixed script of results and records every
/// call it receives. An exhausted script answers with an empty `End`.
#[derive(Default)]
pub struct ScriptedExporter {
    script: Mutex<VecDeque<ScriptedResult>>,
    calls: Mutex<Vec<Option<ExportInformation>>>,
}

impl ScriptedExporter {
    /// Creates an exporter with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `Continue` page pointing at `cursor`.
    pub fn then_continue(self, items: &[&str], cursor: &str) -> Self {
        self.push(Ok(ExportResult::continue_with(
            Some(page(items)),
            ContinuationData::next_page(PaginationData::token(cursor)),
        )))
    }

    /// Appends a `Continue` page with arbitrary continuation data.
    pub fn then_continue_with(self, items: &[&str], continuation: ContinuationData) -> Self {
        self.push(Ok(ExportResult::continue_with(Some(page(items)), continuation)))
    }

    /// Appends a final page.
    pub fn then_end(self, items: &[&str]) -> Self {
        self.push(Ok(ExportResult::end(page(items))))
    }

    /// Appends an `Error` result.
    pub fn then_error_result(self) -> Self {
        self.push(Ok(ExportResult::error()))
    }

    /// Appends a failed call.
    pub fn then_fail(self, error: ConnectorError) -> Self {
        self.push(Err(error))
    }

    /// Returns every `info` argument received, in order.
    pub fn calls(&self) -> Vec<Option<ExportInformation>> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn push(self, result: ScriptedResult) -> Self {
        self.script.lock().push_back(result);
        self
    }
}

impl Exporter<Page> for ScriptedExporter {
    fn export(
        &self,
        _job_id: Uuid,
        _auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<Page>, ConnectorError> {
        self.calls.lock().push(info.cloned());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ExportResult::end_empty()))
    }
}

/// An importer that imports every item through the executor and records
/// which items actually ran. Items listed with
/// [`failing`](Self::failing) fail with a recoverable error.
#[derive(Default)]
pub struct RecordingImporter {
    failing: HashSet<String>,
    imported: Mutex<Vec<String>>,
    auth_seen: Mutex<Vec<Vec<u8>>>,
}

impl RecordingImporter {
    /// Creates an importer where every item succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `item` fail with a recoverable error.
    pub fn failing(mut self, item: &str) -> Self {
        self.failing.insert(item.to_string());
        self
    }

    /// Returns the items whose import ran successfully, in order.
    pub fn imported(&self) -> Vec<String> {
        self.imported.lock().clone()
    }

    /// Returns the raw auth bytes passed to each call.
    pub fn auth_seen(&self) -> Vec<Vec<u8>> {
        self.auth_seen.lock().clone()
    }
}

impl Importer<Page> for RecordingImporter {
    fn import_item(
        &self,
        _job_id: Uuid,
        executor: &IdempotentImportExecutor,
        auth: &AuthData,
        data: Page,
    ) -> Result<ImportOutcome, ConnectorError> {
        self.auth_seen.lock().push(auth.expose().to_vec());
        for item in data {
            executor.execute_and_swallow(&item, &item, || {
                if self.failing.contains(&item) {
                    return Err(ConnectorError::io(format!("{item} rejected")));
                }
                self.imported.lock().push(item.clone());
                Ok(item.clone())
            })?;
        }
        Ok(ImportOutcome::Ok)
    }
}

fn page(items: &[&str]) -> Page {
    items.iter().map(|s| (*s).to_string()).collect()
}
