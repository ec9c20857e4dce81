//! Reap command implementation.

use chrono::Utc;
use std::fs;
use std::path::Path;
use std::time::Duration;
use transit_worker::{reap_stale_jobs, WorkerConfig};

/// Runs the reap command.
pub fn run(
    path: &Path,
    stale_secs: Option<u64>,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stale_after = threshold(stale_secs, config)?;
    let store = super::open_store(path)?;
    let reaped = reap_stale_jobs(&store, stale_after, Utc::now())?;

    if reaped.is_empty() {
        println!("No stalled jobs");
        return Ok(());
    }
    for id in &reaped {
        println!("  {id} -> ERROR");
    }
    println!("Reaped {} job(s)", reaped.len());
    Ok(())
}

/// Picks the stall threshold: an explicit `--stale-secs`, else the worker
/// config's `stale_after`.
pub fn threshold(
    stale_secs: Option<u64>,
    config: Option<&Path>,
) -> Result<Duration, Box<dyn std::error::Error>> {
    if let Some(secs) = stale_secs {
        return Ok(Duration::from_secs(secs));
    }
    let config = match config {
        Some(path) => WorkerConfig::from_json(&fs::read_to_string(path)?)?,
        None => WorkerConfig::default(),
    };
    Ok(config.stale_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_seconds_win() {
        assert_eq!(threshold(Some(90), None).unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn defaults_to_worker_config() {
        assert_eq!(
            threshold(None, None).unwrap(),
            WorkerConfig::default().stale_after
        );
    }

    #[test]
    fn reads_worker_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.json");
        fs::write(&path, r#"{ "stale_after_millis": 120000 }"#).unwrap();

        assert_eq!(
            threshold(None, Some(&path)).unwrap(),
            Duration::from_secs(120)
        );
        assert!(threshold(None, Some(&dir.path().join("absent.json"))).is_err());
    }
}
