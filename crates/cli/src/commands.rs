//! Subcommand implementations.
//!
//! Each command builds its own [`EtlApi`] from the loaded [`CliConfig`].
//! `start` and `watch` create a [`JobMonitor`] for the lifetime of the
//! command, print events as they arrive, and tear everything down before
//! returning.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use etlwatch_client::EtlApi;
use etlwatch_core::request::EtlJobRequest;
use etlwatch_core::types::JobId;
use etlwatch_events::{EventBus, Notifier};
use etlwatch_monitor::{JobMonitor, PollOutcome};
use tokio::task::JoinHandle;

use crate::config::CliConfig;
use crate::render;

/// How long to wait for the printer and notifier to drain after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn build_api(config: &CliConfig) -> anyhow::Result<EtlApi> {
    EtlApi::with_timeout(config.api_url.as_str(), config.http_timeout)
        .context("Failed to build HTTP client")
}

/// Read, validate, and submit a job request file, then follow the job.
///
/// Returns `true` if the job completed.
pub async fn start(config: &CliConfig, request_path: &Path) -> anyhow::Result<bool> {
    let raw = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("Failed to read job request {}", request_path.display()))?;
    let request = EtlJobRequest::from_json(&raw)?;

    let session = Session::open(config)?;
    let submitted = session.monitor.submit(&request).await;
    let (job_id, handle) = match submitted {
        Ok(started) => started,
        Err(e) => {
            session.close().await;
            return Err(e.into());
        }
    };

    let outcomes = session.follow(vec![(job_id, handle)]).await;
    session.close().await;
    Ok(all_completed(&outcomes))
}

/// Follow jobs that were started elsewhere.
///
/// Returns `true` if every job completed.
pub async fn watch(config: &CliConfig, job_ids: &[JobId]) -> anyhow::Result<bool> {
    let session = Session::open(config)?;

    let mut handles = Vec::with_capacity(job_ids.len());
    for job_id in job_ids {
        match session.monitor.watch(job_id.clone()).await {
            Ok(handle) => handles.push((job_id.clone(), handle)),
            Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Skipping job"),
        }
    }

    let outcomes = session.follow(handles).await;
    session.close().await;
    Ok(all_completed(&outcomes))
}

/// An interrupted run yields no outcomes and does not count as success.
fn all_completed(outcomes: &[PollOutcome]) -> bool {
    !outcomes.is_empty() && outcomes.iter().all(PollOutcome::is_completed)
}

/// Print the service's job history.
pub async fn history(config: &CliConfig, limit: Option<usize>) -> anyhow::Result<bool> {
    let api = build_api(config)?;
    let mut records = api.history().await.context("Failed to load ETL job history")?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    print!("{}", render::history_table(&records));
    Ok(true)
}

/// Print the service's dashboard statistics.
pub async fn stats(config: &CliConfig) -> anyhow::Result<bool> {
    let api = build_api(config)?;
    let stats = api
        .dashboard_stats()
        .await
        .context("Failed to load dashboard statistics")?;
    for line in render::stats_lines(&stats) {
        println!("{line}");
    }
    Ok(true)
}

/// Print the service health; returns `true` if healthy.
pub async fn health(config: &CliConfig) -> anyhow::Result<bool> {
    let api = build_api(config)?;
    let health = api
        .health()
        .await
        .with_context(|| format!("ETL service at {} is not reachable", api.api_url()))?;
    println!("{}", render::health_line(api.api_url(), &health));
    Ok(health.is_healthy())
}

/// Monitor, bus, and presentation tasks for one command run.
struct Session {
    monitor: Arc<JobMonitor>,
    bus: Arc<EventBus>,
    printer: JoinHandle<()>,
    notifier: JoinHandle<usize>,
}

impl Session {
    fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let api = build_api(config)?;
        let bus = Arc::new(EventBus::default());

        // Subscribe before the monitor exists so no event is missed.
        let printer = tokio::spawn(render::print_events(bus.subscribe()));
        let notifier = tokio::spawn(Notifier::new().run(bus.subscribe()));

        let monitor = JobMonitor::new(Arc::new(api), Arc::clone(&bus), config.poll);
        tracing::info!(
            api_url = %config.api_url,
            interval_ms = config.poll.interval.as_millis() as u64,
            max_attempts = config.poll.max_attempts,
            "Job monitor started",
        );

        Ok(Self {
            monitor,
            bus,
            printer,
            notifier,
        })
    }

    /// Wait for every polling task, stopping all jobs on Ctrl-C.
    async fn follow(&self, handles: Vec<(JobId, JoinHandle<PollOutcome>)>) -> Vec<PollOutcome> {
        let wait_all = async {
            let mut outcomes = Vec::with_capacity(handles.len());
            for (job_id, handle) in handles {
                match handle.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => tracing::error!(job_id = %job_id, error = %e, "Polling task panicked"),
                }
            }
            outcomes
        };

        tokio::select! {
            outcomes = wait_all => outcomes,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping all monitored jobs");
                for job in self.monitor.active_jobs().await {
                    if let Err(e) = self.monitor.stop(&job.id).await {
                        tracing::debug!(job_id = %job.id, error = %e, "Job already finished");
                    }
                }
                Vec::new()
            }
        }
    }

    /// Shut the monitor down and let the presentation tasks drain.
    async fn close(self) {
        self.monitor.shutdown().await;

        // Dropping the last bus handles closes the channel, which ends
        // the printer and notifier loops.
        drop(self.monitor);
        drop(self.bus);

        let _ = tokio::time::timeout(DRAIN_TIMEOUT, self.printer).await;
        match tokio::time::timeout(DRAIN_TIMEOUT, self.notifier).await {
            Ok(Ok(delivered)) => tracing::debug!(delivered, "Notifier finished"),
            _ => tracing::warn!("Notifier did not finish cleanly"),
        }
    }
}
