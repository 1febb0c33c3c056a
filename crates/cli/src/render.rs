//! Plain-text rendering of job state for the terminal.

use std::fmt::Write as _;

use chrono::Utc;
use etlwatch_client::messages::{DashboardStats, HealthResponse, HistoryRecord};
use etlwatch_core::durations::{format_elapsed, parse_service_time};
use etlwatch_core::job::{Job, LogEntry, LogLevel};
use etlwatch_core::types::Timestamp;
use etlwatch_events::MonitorEvent;
use tokio::sync::broadcast;

/// Number of trailing log lines shown per update.
pub const LOG_TAIL: usize = 10;

/// One status line: id, status, progress, step, elapsed time.
pub fn progress_line(job: &Job, now: Timestamp) -> String {
    let elapsed = format_elapsed((now - job.started_at).num_seconds());
    let mut line = format!(
        "{:<20} {:<9} {:>3}%  {}",
        job.id, job.status, job.progress, elapsed
    );
    if let Some(step) = &job.current_step {
        let _ = write!(line, "  {step}");
    }
    line
}

fn level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Success => "OK",
        LogLevel::Warning => "WARN",
        LogLevel::Error => "ERROR",
        LogLevel::Other => "-",
    }
}

pub fn log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {:<5} {}",
        entry.timestamp,
        level_label(entry.level),
        entry.message
    )
}

/// The last [`LOG_TAIL`] log lines of a job.
pub fn log_tail(job: &Job) -> Vec<String> {
    let skip = job.logs.len().saturating_sub(LOG_TAIL);
    job.logs.iter().skip(skip).map(log_line).collect()
}

/// Per-source record counts of a finished job, one line each.
pub fn result_lines(job: &Job) -> Vec<String> {
    let Some(result) = &job.result else {
        return Vec::new();
    };
    let mut lines: Vec<String> = result
        .per_source
        .iter()
        .map(|(source, count)| format!("  {source:<16} {count:>10}"))
        .collect();
    lines.push(format!("  {:<16} {:>10}", "total", result.total_records));
    lines
}

/// Table of service-side job runs, newest first.
pub fn history_table(records: &[HistoryRecord]) -> String {
    let mut out = format!(
        "{:<20} {:<20} {:<20} {:<9} {:>8} {:>10}  {}\n",
        "ID", "SOURCE", "TARGET", "STATUS", "DURATION", "RECORDS", "STARTED"
    );

    if records.is_empty() {
        out.push_str("(no ETL jobs recorded)\n");
        return out;
    }

    for r in records {
        let started = r
            .start_time
            .as_deref()
            .and_then(parse_service_time)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let _ = writeln!(
            out,
            "{:<20} {:<20} {:<20} {:<9} {:>8} {:>10}  {}",
            r.process_id,
            r.source_table.as_deref().unwrap_or("N/A"),
            r.target_table.as_deref().unwrap_or("N/A"),
            r.status,
            r.duration().unwrap_or_else(|| "N/A".to_string()),
            r.total_records.unwrap_or(0),
            started,
        );
    }
    out
}

/// Dashboard summary: last-24h job counts, then loaded records per brand and table.
pub fn stats_lines(stats: &DashboardStats) -> Vec<String> {
    let activity = &stats.recent_activity;
    let mut lines = vec![
        format!(
            "Last 24h: {} jobs ({} completed, {} running, {} failed), {} records processed",
            activity.total_jobs,
            activity.completed_jobs,
            activity.running_jobs,
            activity.failed_jobs,
            activity.total_processed_records,
        ),
        format!(
            "Loaded: {} records across {} tables from {} brands",
            stats.total_records, stats.total_tables, stats.total_brands
        ),
    ];

    for brand in &stats.brand_stats {
        lines.push(format!("  {:<16} {:>10}", brand.brand_name, brand.record_count));
    }
    for table in &stats.table_stats {
        lines.push(format!("  {:<16} {:>10}", table.table_name, table.record_count));
    }
    lines
}

pub fn health_line(api_url: &str, health: &HealthResponse) -> String {
    format!(
        "{api_url}: {} ({} active processes)",
        health.status, health.active_processes
    )
}

/// Print progress and terminal details for every event until the bus closes.
pub async fn print_events(mut receiver: broadcast::Receiver<MonitorEvent>) {
    loop {
        match receiver.recv().await {
            Ok(MonitorEvent::JobProgress { job, .. }) => {
                println!("{}", progress_line(&job, Utc::now()));
            }
            Ok(MonitorEvent::JobCompleted { job }) => {
                for line in result_lines(&job) {
                    println!("{line}");
                }
            }
            Ok(MonitorEvent::JobFailed { job, .. }) | Ok(MonitorEvent::JobTimedOut { job, .. }) => {
                for line in log_tail(&job) {
                    println!("{line}");
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Progress printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
