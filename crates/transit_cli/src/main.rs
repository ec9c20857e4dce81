//! Transit CLI
//!
//! Operator tools for a durable Transit job store.
//!
//! # Commands
//!
//! - `list` - List jobs, optionally filtered by state
//! - `show` - Display one job record
//! - `reap` - Move stalled assigned jobs to `ERROR`
//! - `compact` - Rewrite the record log with only live jobs

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Transit job store tools.
#[derive(Parser)]
#[command(name = "transit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the job store log file
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs
    List {
        /// Only show jobs in this state (e.g. PENDING_WORKER_ASSIGNMENT)
        #[arg(long)]
        state: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display one job record
    Show {
        /// Job id
        id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Move jobs stuck in an assigned state to ERROR
    Reap {
        /// Seconds since the last update after which a job is stalled
        #[arg(long)]
        stale_secs: Option<u64>,

        /// Worker config file supplying `stale_after_millis`
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rewrite the record log with only live jobs
    Compact,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::List { state, format } => {
            let path = cli.store.ok_or("Store path required for list")?;
            commands::list::run(&path, state.as_deref(), &format)?;
        }
        Commands::Show { id, format } => {
            let path = cli.store.ok_or("Store path required for show")?;
            commands::show::run(&path, &id, &format)?;
        }
        Commands::Reap { stale_secs, config } => {
            let path = cli.store.ok_or("Store path required for reap")?;
            commands::reap::run(&path, stale_secs, config.as_deref())?;
        }
        Commands::Compact => {
            let path = cli.store.ok_or("Store path required for compact")?;
            commands::compact::run(&path)?;
        }
        Commands::Version => {
            println!("Transit CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
