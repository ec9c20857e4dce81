//! Error types for connectors and the transfer loop.

use thiserror::Error;
use transit_retry::RetryError;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// A failure reported by an exporter or importer call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// An I/O-class failure limited to a single call or item.
    ///
    /// The import executor swallows these per item.
    #[error("connector I/O error: {message}")]
    Io {
        /// Description of the failure.
        message: String,
    },

    /// A failure that must stop the job.
    #[error("connector failure: {message}")]
    Fatal {
        /// Description of the failure.
        message: String,
    },
}

impl ConnectorError {
    /// Creates a recoverable I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Returns true for errors a single item may fail with without failing
    /// the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Errors that end a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// An export call kept failing after retries.
    #[error("export failed: {0}")]
    Export(#[from] RetryError<ConnectorError>),

    /// The exporter returned a result of type `Error`.
    #[error("exporter reported an error")]
    ExportReported,

    /// The importer reported a page as failed.
    #[error("import failed: {message}")]
    Import {
        /// The importer's message.
        message: String,
    },

    /// An item that had to succeed did not.
    #[error("item {key} failed: {source}")]
    Item {
        /// Item key.
        key: String,
        /// The final failure.
        #[source]
        source: ConnectorError,
    },

    /// A connector call failed outside the executor.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl TransferError {
    /// Creates an import failure.
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }
}
