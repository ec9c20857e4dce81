//! List command implementation.

use serde::Serialize;
use std::path::Path;
use transit_store::{JobState, JobStore, StoreResult};

/// One row of the job listing.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    /// Job id.
    pub id: String,
    /// Current state.
    pub state: JobState,
    /// Export service.
    pub export_service: String,
    /// Import service.
    pub import_service: String,
    /// Data vertical.
    pub data_type: String,
    /// Whether sealed auth data is present.
    pub has_auth_data: bool,
    /// Last update, RFC3339.
    pub updated_at: String,
    /// Failure detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Runs the list command.
pub fn run(path: &Path, state: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = state.map(str::parse::<JobState>).transpose()?;
    let store = super::open_store(path)?;
    let jobs = collect(&store, filter)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&jobs)?),
        _ => print!("{}", render_text(&jobs)),
    }
    Ok(())
}

/// Gathers jobs in `state`, or in every state, oldest first.
pub fn collect(store: &dyn JobStore, state: Option<JobState>) -> StoreResult<Vec<JobSummary>> {
    let states = match state {
        Some(state) => vec![state],
        None => JobState::ALL.to_vec(),
    };

    let mut jobs = Vec::new();
    for state in states {
        for id in store.find_all(state)? {
            if let Some(job) = store.find(id)? {
                jobs.push(job);
            }
        }
    }
    jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    Ok(jobs
        .into_iter()
        .map(|job| JobSummary {
            id: job.id.to_string(),
            state: job.state,
            has_auth_data: job.has_auth_data(),
            updated_at: job.updated_at.to_rfc3339(),
            export_service: job.export_service,
            import_service: job.import_service,
            data_type: job.data_type,
            failure_reason: job.failure_reason,
        })
        .collect())
}

/// Formats jobs as an aligned table.
pub fn render_text(jobs: &[JobSummary]) -> String {
    if jobs.is_empty() {
        return "No jobs\n".to_string();
    }

    let mut out = format!(
        "{:<36}  {:<26}  {:<24}  {}\n",
        "ID", "STATE", "ROUTE", "UPDATED"
    );
    for job in jobs {
        let route = format!("{} -> {}", job.export_service, job.import_service);
        out.push_str(&format!(
            "{:<36}  {:<26}  {:<24}  {}\n",
            job.id,
            job.state.as_str(),
            route,
            job.updated_at
        ));
    }
    out.push_str(&format!("{} job(s)\n", jobs.len()));
    out
}
