//! Show command implementation.

use std::path::Path;
use transit_store::{Job, JobId, JobStore};

/// Runs the show command.
pub fn run(path: &Path, id: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id: JobId = id.parse()?;
    let store = super::open_store(path)?;
    let job = store
        .find(id)?
        .ok_or_else(|| format!("Job {id} not found"))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&job)?),
        _ => print!("{}", render_text(&job)),
    }
    Ok(())
}

/// Formats a job for humans. Blobs are shown by size only.
pub fn render_text(job: &Job) -> String {
    let blob = |b: &Option<Vec<u8>>| match b {
        Some(bytes) => format!("<{} bytes>", bytes.len()),
        None => "-".to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!("Job {}\n", job.id));
    out.push_str(&format!("  State:          {}\n", job.state));
    out.push_str(&format!("  Export service: {}\n", job.export_service));
    out.push_str(&format!("  Import service: {}\n", job.import_service));
    out.push_str(&format!("  Data type:      {}\n", job.data_type));
    out.push_str(&format!("  Worker key:     {}\n", blob(&job.worker_public_key)));
    out.push_str(&format!("  Export auth:    {}\n", blob(&job.encrypted_export_auth)));
    out.push_str(&format!("  Import auth:    {}\n", blob(&job.encrypted_import_auth)));
    out.push_str(&format!("  Created:        {}\n", job.created_at.to_rfc3339()));
    out.push_str(&format!("  Updated:        {}\n", job.updated_at.to_rfc3339()));
    if let Some(reason) = &job.failure_reason {
        out.push_str(&format!("  Failure:        {reason}\n"));
    }
    out
}
