//! Record log backend trait definition.

use crate::error::StoreResult;

/// A byte log underneath a [`DurableJobStore`](crate::DurableJobStore).
///
/// Backends are **opaque byte stores**. They do not understand job records
/// or frames; the durable store owns all format interpretation.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_all` returns every byte appended since the last `replace`
/// - `sync` makes all appended data durable
/// - `truncate` discards bytes appended after a known size
/// - `replace` atomically swaps the whole log for new contents
pub trait LogBackend: Send {
    /// Reads the entire log.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> StoreResult<Vec<u8>>;

    /// Appends data to the end of the log.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StoreResult<u64>;

    /// Flushes and syncs all appended data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StoreResult<()>;

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StoreResult<u64>;

    /// Shrinks the log to its first `len` bytes.
    ///
    /// Used to roll back a frame whose write did not complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be shortened.
    fn truncate(&mut self, len: u64) -> StoreResult<()>;

    /// Replaces the whole log with `data`.
    ///
    /// Used for compaction. After a crash the log holds either the old or
    /// the new contents, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement fails.
    fn replace(&mut self, data: &[u8]) -> StoreResult<()>;
}
