//! `etlwatch` -- submit ETL jobs and follow them to completion.
//!
//! Talks to an ETL execution service over HTTP, polls each job's status
//! at a fixed interval, and prints progress, logs, and final record
//! counts. Exits non-zero if any followed job fails, times out, or is
//! interrupted.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default                 | Description                        |
//! |-------------------------|----------|-------------------------|------------------------------------|
//! | `ETL_API_URL`           | no       | `http://127.0.0.1:5000` | Base URL of the execution service  |
//! | `ETL_HTTP_TIMEOUT_SECS` | no       | `30`                    | Per-request HTTP timeout           |
//! | `ETL_POLL_INTERVAL_MS`  | no       | `1000`                  | Delay between status polls         |
//! | `ETL_POLL_MAX_ATTEMPTS` | no       | `300`                   | Polls before a job is timed out    |
//! | `RUST_LOG`              | no       | `etlwatch=info`         | Log filter                         |

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use etlwatch_cli::commands;
use etlwatch_cli::config::CliConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "etlwatch", version, about = "Submit and monitor ETL jobs")]
struct Cli {
    /// Override `ETL_API_URL`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a job request (JSON file) and follow it until it finishes.
    Start {
        /// Path to the job request JSON.
        request: PathBuf,
    },
    /// Follow jobs that are already running.
    Watch {
        #[arg(required = true)]
        job_ids: Vec<String>,
    },
    /// List jobs recorded by the service.
    History {
        /// Show at most this many jobs.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show loaded record counts and the last 24 hours of job activity.
    Stats,
    /// Check that the service is reachable and healthy.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etlwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let result = match cli.command {
        Command::Start { request } => commands::start(&config, &request).await,
        Command::Watch { job_ids } => commands::watch(&config, &job_ids).await,
        Command::History { limit } => commands::history(&config, limit).await,
        Command::Stats => commands::stats(&config).await,
        Command::Health => commands::health(&config).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "etlwatch failed");
            ExitCode::FAILURE
        }
    }
}
