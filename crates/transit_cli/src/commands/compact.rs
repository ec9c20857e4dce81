//! Compact command implementation.

use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(path)?;

    let before = store.log_size()?;
    store.compact()?;
    let after = store.log_size()?;

    println!("Compacted job store at {}", path.display());
    println!("  Live jobs:   {}", store.len());
    println!("  Size before: {before} bytes");
    println!("  Size after:  {after} bytes");
    println!("  Space saved: {} bytes", before.saturating_sub(after));
    Ok(())
}
