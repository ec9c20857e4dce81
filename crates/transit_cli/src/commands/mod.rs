//! CLI command implementations.

pub mod compact;
pub mod list;
pub mod reap;
pub mod show;

use std::path::Path;
use transit_store::{DurableJobStore, FileLog, StoreConfig};

/// Opens an existing store file.
pub fn open_store(path: &Path) -> Result<DurableJobStore<FileLog>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No job store found at {}", path.display()).into());
    }
    tracing::debug!(path = %path.display(), "opening job store");
    Ok(DurableJobStore::open_file(path, StoreConfig::default())?)
}
