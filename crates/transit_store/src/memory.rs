//! In-memory log backend for testing.

use crate::backend::LogBackend;
use crate::error::StoreResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory log backend.
///
/// Clones share the same buffer, so a test can keep a handle to the bytes
/// while a [`DurableJobStore`](crate::DurableJobStore) owns the backend,
/// then reopen a second store over the same log to simulate a restart.
///
/// # Example
///
/// ```rust
/// use transit_store::{LogBackend, MemoryLog};
///
/// let mut log = MemoryLog::new();
/// let offset = log.append(b"frame").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(log.size().unwrap(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    data: Arc<RwLock<Vec<u8>>>,
}

impl MemoryLog {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log with pre-existing data.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of all bytes in the log.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogBackend for MemoryLog {
    fn read_all(&self) -> StoreResult<Vec<u8>> {
        Ok(self.data.read().clone())
    }

    fn append(&mut self, new_data: &[u8]) -> StoreResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn sync(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.data.write().truncate(len as usize);
        Ok(())
    }

    fn replace(&mut self, new_data: &[u8]) -> StoreResult<()> {
        *self.data.write() = new_data.to_vec();
        Ok(())
    }
}
