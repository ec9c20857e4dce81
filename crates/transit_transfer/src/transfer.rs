//! The export/import loop.

use crate::auth::AuthData;
use crate::connector::{Exporter, ImportOutcome, Importer};
use crate::continuation::{ExportInformation, ExportResult, ResultType};
use crate::error::{TransferError, TransferResult};
use crate::executor::{ErrorDetail, IdempotentImportExecutor};
use std::sync::Arc;
use tracing::{debug, info, warn};
use transit_retry::{RetryStrategyLibrary, RetryingCallable, Sleeper, ThreadSleeper};
use uuid::Uuid;

/// What a finished transfer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Export calls that returned a page.
    pub pages: usize,
    /// Item keys imported successfully.
    pub items_imported: usize,
    /// Items that failed without stopping the job.
    pub item_errors: Vec<ErrorDetail>,
}

/// Moves one job's data from an exporter to an importer.
///
/// Pending work is a stack of cursors. A page's next cursor is always taken
/// before any container it listed, so the current scope is exhausted before
/// drilling down. Only cursors are held between pages.
pub struct Transfer<T> {
    exporter: Arc<dyn Exporter<T>>,
    importer: Arc<dyn Importer<T>>,
    retry: Arc<RetryStrategyLibrary>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T> Transfer<T> {
    /// Creates a transfer that does not retry failed export calls.
    pub fn new(exporter: Arc<dyn Exporter<T>>, importer: Arc<dyn Importer<T>>) -> Self {
        Self {
            exporter,
            importer,
            retry: Arc::new(RetryStrategyLibrary::no_retry()),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Retries export calls and item imports with `library`.
    #[must_use]
    pub fn with_retry_library(mut self, library: Arc<RetryStrategyLibrary>) -> Self {
        self.retry = library;
        self
    }

    /// Replaces the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Runs the transfer to completion.
    ///
    /// # Errors
    ///
    /// Fails when an export call is exhausted, the exporter reports
    /// `Error`, the importer reports a failed page, or a connector returns
    /// a fatal error. Failed items that were swallowed do not fail the
    /// transfer; they are listed in the summary.
    pub fn run(
        &self,
        job_id: Uuid,
        export_auth: &AuthData,
        import_auth: &AuthData,
    ) -> TransferResult<TransferSummary> {
        let executor = IdempotentImportExecutor::new(job_id)
            .with_retry_library(Arc::clone(&self.retry))
            .with_sleeper(Arc::clone(&self.sleeper));

        let mut summary = TransferSummary::default();
        let mut pending: Vec<Option<ExportInformation>> = vec![None];

        while let Some(info) = pending.pop() {
            let result = self.export_page(job_id, export_auth, info.as_ref())?;
            let (result_type, data, continuation) = result.into_parts();
            if result_type == ResultType::Error {
                return Err(TransferError::ExportReported);
            }
            summary.pages += 1;

            if let Some(data) = data {
                match self
                    .importer
                    .import_item(job_id, &executor, import_auth, data)?
                {
                    ImportOutcome::Ok => {}
                    ImportOutcome::Error(message) => return Err(TransferError::import(message)),
                }
            }

            if result_type != ResultType::Continue {
                continue;
            }
            let Some(continuation) = continuation else {
                warn!(job_id = %job_id, "continue result without continuation data");
                continue;
            };

            let scope = info.and_then(|i| i.container);
            for container in continuation.containers.into_iter().rev() {
                pending.push(Some(ExportInformation::container(container)));
            }
            if let Some(pagination) = continuation.pagination {
                pending.push(Some(ExportInformation::page(pagination, scope)));
            }
            debug!(job_id = %job_id, pending = pending.len(), "page done");
        }

        summary.items_imported = executor.success_count();
        summary.item_errors = executor.errors();
        info!(
            job_id = %job_id,
            pages = summary.pages,
            items = summary.items_imported,
            item_errors = summary.item_errors.len(),
            "transfer finished"
        );
        Ok(summary)
    }

    fn export_page(
        &self,
        job_id: Uuid,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> TransferResult<ExportResult<T>> {
        let exporter = &self.exporter;
        RetryingCallable::new(&self.retry, || exporter.export(job_id, auth, info))
            .with_sleeper(Arc::clone(&self.sleeper))
            .call()
            .map_err(TransferError::from)
    }
}

impl<T> std::fmt::Debug for Transfer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::{ContainerResource, ContinuationData, PaginationData};
    use crate::error::ConnectorError;
    use parking_lot::Mutex;
    use std::time::Duration;
    use transit_retry::{NoRetryStrategy, RetryMapping, UniformRetryStrategy};

    /// Serves a fixed tree: two top-level pages listing albums, each album
    /// with one page of photos.
    #[derive(Default)]
    struct AlbumExporter {
        calls: Mutex<Vec<Option<ExportInformation>>>,
    }

    impl Exporter<Vec<String>> for AlbumExporter {
        fn export(
            &self,
            _job_id: Uuid,
            _auth: &AuthData,
            info: Option<&ExportInformation>,
        ) -> Result<ExportResult<Vec<String>>, ConnectorError> {
            self.calls.lock().push(info.cloned());
            let container = info.and_then(|i| i.container.as_ref());
            let page = info.and_then(|i| i.pagination.as_ref());
            Ok(match (container, page) {
                (None, None) => ExportResult::continue_with(
                    Some(vec!["album:a".into()]),
                    ContinuationData::next_page(PaginationData::token("albums-2"))
                        .with_container(ContainerResource::new("a", "album")),
                ),
                (None, Some(_)) => ExportResult::continue_with(
                    Some(vec!["album:b".into()]),
                    ContinuationData::default().with_container(ContainerResource::new("b", "album")),
                ),
                (Some(album), _) => ExportResult::end(vec![format!("photo:{}1", album.id)]),
            })
        }
    }

    #[derive(Default)]
    struct CollectingImporter {
        seen: Mutex<Vec<String>>,
    }

    impl Importer<Vec<String>> for CollectingImporter {
        fn import_item(
            &self,
            _job_id: Uuid,
            executor: &IdempotentImportExecutor,
            _auth: &AuthData,
            data: Vec<String>,
        ) -> Result<ImportOutcome, ConnectorError> {
            for item in data {
                executor.execute_and_swallow(&item, &item, || {
                    self.seen.lock().push(item.clone());
                    Ok(())
                })?;
            }
            Ok(ImportOutcome::Ok)
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    fn auth() -> AuthData {
        AuthData::from("token")
    }

    #[test]
    fn drills_into_containers_after_current_scope() {
        let exporter = Arc::new(AlbumExporter::default());
        let importer = Arc::new(CollectingImporter::default());
        let transfer = Transfer::<Vec<String>>::new(exporter.clone(), importer.clone());

        let summary = transfer.run(Uuid::new_v4(), &auth(), &auth()).unwrap();

        assert_eq!(summary.pages, 4);
        assert_eq!(summary.items_imported, 4);
        assert!(summary.item_errors.is_empty());
        assert_eq!(
            *importer.seen.lock(),
            vec!["album:a", "album:b", "photo:b1", "photo:a1"]
        );

        let calls = exporter.calls.lock();
        assert_eq!(calls[0], None);
        assert_eq!(
            calls[1].as_ref().and_then(|i| i.pagination.clone()),
            Some(PaginationData::token("albums-2"))
        );
    }

    struct FailingExporter {
        failures: Mutex<u32>,
        result: fn() -> ExportResult<Vec<String>>,
    }

    impl Exporter<Vec<String>> for FailingExporter {
        fn export(
            &self,
            _job_id: Uuid,
            _auth: &AuthData,
            _info: Option<&ExportInformation>,
        ) -> Result<ExportResult<Vec<String>>, ConnectorError> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(ConnectorError::io("503 service unavailable"));
            }
            Ok((self.result)())
        }
    }

    fn retrying() -> Arc<RetryStrategyLibrary> {
        Arc::new(RetryStrategyLibrary::new(
            vec![RetryMapping::new(&["503"], Arc::new(UniformRetryStrategy::new(2, 10))).unwrap()],
            Arc::new(NoRetryStrategy),
        ))
    }

    #[test]
    fn export_failures_are_retried() {
        let exporter = Arc::new(FailingExporter {
            failures: Mutex::new(2),
            result: || ExportResult::end(vec!["x".into()]),
        });
        let transfer = Transfer::<Vec<String>>::new(exporter, Arc::new(CollectingImporter::default()))
            .with_retry_library(retrying())
            .with_sleeper(Arc::new(NoSleep));

        let summary = transfer.run(Uuid::new_v4(), &auth(), &auth()).unwrap();
        assert_eq!(summary.pages, 1);
    }

    #[test]
    fn exhausted_export_fails_transfer() {
        let exporter = Arc::new(FailingExporter {
            failures: Mutex::new(3),
            result: || ExportResult::end_empty(),
        });
        let transfer = Transfer::<Vec<String>>::new(exporter, Arc::new(CollectingImporter::default()))
            .with_retry_library(retrying())
            .with_sleeper(Arc::new(NoSleep));

        let err = transfer.run(Uuid::new_v4(), &auth(), &auth()).unwrap_err();
        assert!(matches!(err, TransferError::Export(ref e) if e.attempts() == 3));
    }

    #[test]
    fn error_result_fails_transfer() {
        let exporter = Arc::new(FailingExporter {
            failures: Mutex::new(0),
            result: ExportResult::error,
        });
        let transfer = Transfer::<Vec<String>>::new(exporter, Arc::new(CollectingImporter::default()));
        let err = transfer.run(Uuid::new_v4(), &auth(), &auth()).unwrap_err();
        assert!(matches!(err, TransferError::ExportReported));
    }

    struct RejectingImporter;

    impl Importer<Vec<String>> for RejectingImporter {
        fn import_item(
            &self,
            _job_id: Uuid,
            _executor: &IdempotentImportExecutor,
            _auth: &AuthData,
            _data: Vec<String>,
        ) -> Result<ImportOutcome, ConnectorError> {
            Ok(ImportOutcome::Error("quota exceeded".into()))
        }
    }

    #[test]
    fn import_error_outcome_fails_transfer() {
        let exporter = Arc::new(FailingExporter {
            failures: Mutex::new(0),
            result: || ExportResult::end(vec!["x".into()]),
        });
        let transfer = Transfer::<Vec<String>>::new(exporter, Arc::new(RejectingImporter));
        let err = transfer.run(Uuid::new_v4(), &auth(), &auth()).unwrap_err();
        assert!(matches!(err, TransferError::Import { ref message } if message == "quota exceeded"));
    }
}
