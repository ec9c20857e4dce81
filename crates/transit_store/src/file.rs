//! File-based log backend for persistent job stores.

use crate::backend::LogBackend;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based log backend.
///
/// The log lives in a single file. A sibling `<file>.lock` holds an
/// exclusive advisory lock for as long as the backend is open, so only one
/// process can own a durable job store at a time.
///
/// # Durability
///
/// - `sync()` calls `File::sync_all()`
/// - `replace()` writes a temporary file, syncs it and renames it over the log
///
/// # Example
///
/// ```no_run
/// use transit_store::{FileLog, LogBackend};
/// use std::path::Path;
///
/// let mut log = FileLog::open(Path::new("jobs.log")).unwrap();
/// log.append(b"frame").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: File,
    size: u64,
    _lock_file: File,
}

impl FileLog {
    /// Opens or creates a log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the lock, or
    /// an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(Self::lock_path(path))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        let file = Self::open_data(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn open_data(path: &Path) -> StoreResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }
}

impl LogBackend for FileLog {
    fn read_all(&self) -> StoreResult<Vec<u8>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        if let Err(err) = self.file.write_all(data) {
            // A partial write must not leave a torn frame ahead of later appends.
            self.file.set_len(offset)?;
            return Err(err.into());
        }
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        if len >= self.size {
            return Ok(());
        }
        self.file.set_len(len)?;
        self.size = len;
        self.file.sync_all()?;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StoreResult<()> {
        let temp_path = self.temp_path();

        let mut temp = File::create(&temp_path)?;
        temp.write_all(data)?;
        temp.sync_all()?;
        drop(temp);

        fs::rename(&temp_path, &self.path)?;

        self.file = Self::open_data(&self.path)?;
        self.size = data.len() as u64;
        Ok(())
    }
}
