//! User-facing notifications derived from monitor events.
//!
//! [`Notifier`] subscribes to the [`EventBus`](crate::EventBus) and turns
//! each [`MonitorEvent`] into a short [`Notification`], emitted through
//! `tracing` at a level matching its severity. Progress updates are not
//! notifications; only lifecycle changes are.

use chrono::Utc;
use etlwatch_core::durations::format_elapsed;
use etlwatch_core::types::Timestamp;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::bus::MonitorEvent;

/// How prominently a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// A titled message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn new(severity: Severity, title: &str, message: String) -> Self {
        Self {
            severity,
            title: title.to_string(),
            message,
        }
    }

    /// Build the notification for `event`, or `None` for progress updates.
    ///
    /// `now` is used to compute the elapsed time of completed jobs.
    pub fn from_event(event: &MonitorEvent, now: Timestamp) -> Option<Self> {
        let notification = match event {
            MonitorEvent::JobProgress { .. } => return None,
            MonitorEvent::JobStarted { job_id } => Self::new(
                Severity::Success,
                "ETL job started",
                format!("ETL job started with ID {job_id}"),
            ),
            MonitorEvent::JobCompleted { job } => {
                let elapsed = format_elapsed((now - job.started_at).num_seconds());
                Self::new(
                    Severity::Success,
                    "ETL job completed",
                    format!(
                        "Transferred {} records in {elapsed}",
                        job.total_records()
                    ),
                )
            }
            MonitorEvent::JobFailed { error, .. } => {
                Self::new(Severity::Error, "ETL job failed", error.clone())
            }
            MonitorEvent::JobTimedOut { .. } => Self::new(
                Severity::Error,
                "ETL job timeout",
                "Job exceeded maximum execution time.".to_string(),
            ),
            MonitorEvent::MonitorError { error, .. } => {
                Self::new(Severity::Error, "Monitoring error", error.clone())
            }
            MonitorEvent::JobStopped { job_id } => Self::new(
                Severity::Warning,
                "Job stopped",
                format!("Job {job_id} has been stopped."),
            ),
        };
        Some(notification)
    }
}

/// Delivers notifications for every event on the bus.
#[derive(Debug, Default)]
pub struct Notifier {
    delivered: usize,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the delivery loop.
    ///
    /// Exits when the channel is closed (i.e. the
    /// [`EventBus`](crate::EventBus) is dropped) and returns the number of
    /// notifications delivered.
    pub async fn run(mut self, mut receiver: broadcast::Receiver<MonitorEvent>) -> usize {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notifier lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, notifier shutting down");
                    break;
                }
            }
        }
        self.delivered
    }

    fn handle(&mut self, event: &MonitorEvent) {
        if let MonitorEvent::JobProgress { job, attempt } = event {
            tracing::debug!(
                job_id = %job.id,
                attempt,
                status = %job.status,
                progress = job.progress,
                step = job.current_step.as_deref().unwrap_or(""),
                "Job progress",
            );
            return;
        }

        let Some(n) = Notification::from_event(event, Utc::now()) else {
            return;
        };
        let job_id = event.job_id();
        match n.severity {
            Severity::Error => tracing::error!(job_id, title = %n.title, "{}", n.message),
            Severity::Warning => tracing::warn!(job_id, title = %n.title, "{}", n.message),
            Severity::Success => {
                tracing::info!(job_id, title = %n.title, "{}", n.message)
            }
        }
        self.delivered += 1;
    }
}
