//! Per-job status polling.
//!
//! [`JobMonitor`] is created once at application start and shared via
//! `Arc`. Each watched job gets its own task which polls the backend,
//! applies the result to the registry, publishes a progress event, and
//! then either stops (terminal status, transport error, exhausted attempt
//! budget) or sleeps for the configured interval. A job's requests never
//! overlap: the next one is only scheduled after the previous response
//! has been fully processed.
//!
//! Both suspension points (the request and the sleep) race against the
//! job's [`CancellationToken`], which is a child of the monitor's master
//! token. Stopping a job cancels its token and removes it from the
//! registry; the task then exits without publishing anything further.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use etlwatch_client::{EtlApiError, EtlBackend};
use etlwatch_core::job::{Job, JobStatus, StatusTransition, UNKNOWN_FAILURE};
use etlwatch_core::request::EtlJobRequest;
use etlwatch_core::types::{JobId, Timestamp};
use etlwatch_events::{EventBus, MonitorEvent};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::PollConfig;
use crate::error::{MonitorError, PollError};
use crate::history::JobHistory;
use crate::registry::ActiveJobs;

/// How long [`JobMonitor::shutdown`] waits for polling tasks to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How a polling task ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// The service reported `completed`.
    Completed(Job),
    /// Polling ended with an error; see [`PollError`].
    Failed(PollError),
    /// The job was stopped by the user or the monitor shut down.
    Stopped,
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed(_))
    }
}

/// Owns the active-job registry and the polling tasks.
pub struct JobMonitor {
    jobs: Arc<ActiveJobs>,
    history: Arc<JobHistory>,
    backend: Arc<dyn EtlBackend>,
    events: Arc<EventBus>,
    config: PollConfig,
    tasks: TaskTracker,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl JobMonitor {
    /// Create a monitor polling `backend` and publishing on `events`.
    pub fn new(backend: Arc<dyn EtlBackend>, events: Arc<EventBus>, config: PollConfig) -> Arc<Self> {
        Arc::new(Self {
            jobs: Arc::new(ActiveJobs::new()),
            history: Arc::new(JobHistory::default()),
            backend,
            events,
            config,
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Snapshots of all jobs currently being polled, oldest first.
    pub async fn active_jobs(&self) -> Vec<Job> {
        self.jobs.list().await
    }

    /// Snapshot of one job currently being polled.
    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).await
    }

    /// Jobs that completed or failed during this session, newest first.
    pub async fn recent_history(&self) -> Vec<Job> {
        self.history.recent().await
    }

    /// Validate and submit a job, then start watching it.
    ///
    /// An invalid request is never sent to the service.
    pub async fn submit(
        &self,
        request: &EtlJobRequest,
    ) -> Result<(JobId, JoinHandle<PollOutcome>), MonitorError> {
        if self.cancel.is_cancelled() {
            return Err(MonitorError::ShutDown);
        }

        let errors = request.validate();
        if !errors.is_empty() {
            return Err(MonitorError::InvalidRequest(errors));
        }

        let started_at = Utc::now();
        let job_id = self.backend.start_job(request).await.map_err(|e| {
            tracing::error!(
                source_table = %request.source_table,
                target_table = %request.target_table,
                error = %e,
                "ETL job submission failed",
            );
            MonitorError::Submit(e)
        })?;

        tracing::info!(
            job_id = %job_id,
            source_table = %request.source_table,
            target_table = %request.target_table,
            sources = request.sources.len(),
            "ETL job started",
        );
        self.events.publish(MonitorEvent::JobStarted {
            job_id: job_id.clone(),
        });

        let handle = self.watch_since(job_id.clone(), started_at).await?;
        Ok((job_id, handle))
    }

    /// Start polling an existing job, timing it from now.
    pub async fn watch(&self, job_id: impl Into<JobId>) -> Result<JoinHandle<PollOutcome>, MonitorError> {
        self.watch_since(job_id.into(), Utc::now()).await
    }

    /// Start polling an existing job that was submitted at `started_at`.
    ///
    /// Fails if the id is already being polled.
    pub async fn watch_since(
        &self,
        job_id: JobId,
        started_at: Timestamp,
    ) -> Result<JoinHandle<PollOutcome>, MonitorError> {
        if self.cancel.is_cancelled() {
            return Err(MonitorError::ShutDown);
        }

        let cancel = self.cancel.child_token();
        self.jobs
            .insert(Job::new(job_id.clone(), started_at), cancel.clone())
            .await?;

        let task = PollTask {
            job_id: job_id.clone(),
            jobs: Arc::clone(&self.jobs),
            history: Arc::clone(&self.history),
            backend: Arc::clone(&self.backend),
            events: Arc::clone(&self.events),
            config: self.config,
            cancel,
        };

        tracing::info!(
            job_id = %job_id,
            interval_ms = self.config.interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Monitoring job",
        );

        Ok(self.tasks.spawn(task.run()))
    }

    /// Stop polling a job on behalf of the user.
    ///
    /// Any in-flight request or pending sleep for the job is abandoned and
    /// its result is discarded.
    pub async fn stop(&self, job_id: &str) -> Result<Job, MonitorError> {
        let job = self
            .jobs
            .stop(job_id)
            .await
            .ok_or_else(|| MonitorError::NotMonitored(job_id.to_string()))?;

        tracing::info!(job_id, "Job monitoring stopped by user");
        self.events.publish(MonitorEvent::JobStopped {
            job_id: job_id.to_string(),
        });
        Ok(job)
    }

    /// Cancel every polling task and wait for them to exit.
    ///
    /// No terminal events are published for jobs abandoned this way.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job monitor");
        self.cancel.cancel();

        let abandoned = self.jobs.drain().await;
        if !abandoned.is_empty() {
            tracing::warn!(count = abandoned.len(), "Abandoned jobs still in flight");
        }

        self.tasks.close();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.tasks.wait())
            .await
            .is_err()
        {
            tracing::warn!("Polling tasks did not exit before the shutdown timeout");
        }

        tracing::info!("Job monitor shut down complete");
    }
}

/// State owned by one job's polling task.
struct PollTask {
    job_id: JobId,
    jobs: Arc<ActiveJobs>,
    history: Arc<JobHistory>,
    backend: Arc<dyn EtlBackend>,
    events: Arc<EventBus>,
    config: PollConfig,
    cancel: CancellationToken,
}

impl PollTask {
    /// Poll until the job is terminal, fails, times out, or is stopped.
    async fn run(self) -> PollOutcome {
        let mut attempt = 0u32;

        loop {
            if !self.jobs.is_current(&self.job_id, &self.cancel).await {
                return self.stopped(attempt);
            }

            attempt += 1;
            tracing::debug!(job_id = %self.job_id, attempt, "Polling job status");

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return self.stopped(attempt),
                result = self.backend.fetch_status(&self.job_id) => result,
            };

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => return self.transport_failed(attempt, e).await,
            };

            let Some((job, transition)) = self.jobs.apply(&self.job_id, &self.cancel, snapshot).await
            else {
                return self.stopped(attempt);
            };

            if let StatusTransition::Ignored { current, reported } = transition {
                tracing::warn!(
                    job_id = %self.job_id,
                    current = %current,
                    reported = %reported,
                    "Ignoring backwards status report",
                );
            }

            self.events.publish(MonitorEvent::JobProgress {
                job: job.clone(),
                attempt,
            });

            match job.status {
                JobStatus::Completed => return self.completed(attempt).await,
                JobStatus::Failed => return self.failed(attempt).await,
                JobStatus::Pending | JobStatus::Running => {}
            }

            if attempt >= self.config.max_attempts {
                return self.timed_out(attempt).await;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return self.stopped(attempt),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    fn stopped(&self, attempts: u32) -> PollOutcome {
        tracing::debug!(job_id = %self.job_id, attempts, "Polling task cancelled");
        PollOutcome::Stopped
    }

    async fn completed(&self, attempts: u32) -> PollOutcome {
        let Some(job) = self.jobs.finish(&self.job_id, &self.cancel).await else {
            return self.stopped(attempts);
        };

        tracing::info!(
            job_id = %job.id,
            attempts,
            total_records = job.total_records(),
            "ETL job completed",
        );
        self.history.record(job.clone()).await;
        self.events.publish(MonitorEvent::JobCompleted { job: job.clone() });
        PollOutcome::Completed(job)
    }

    async fn failed(&self, attempts: u32) -> PollOutcome {
        let Some(job) = self.jobs.finish(&self.job_id, &self.cancel).await else {
            return self.stopped(attempts);
        };

        let error = job.failure_detail().unwrap_or(UNKNOWN_FAILURE).to_string();
        tracing::error!(job_id = %job.id, attempts, error = %error, "ETL job failed");
        self.history.record(job.clone()).await;
        self.events.publish(MonitorEvent::JobFailed {
            job,
            error: error.clone(),
        });
        PollOutcome::Failed(PollError::ServiceFailure {
            job_id: self.job_id.clone(),
            error,
        })
    }

    async fn timed_out(&self, attempts: u32) -> PollOutcome {
        let Some(job) = self.jobs.finish(&self.job_id, &self.cancel).await else {
            return self.stopped(attempts);
        };

        tracing::warn!(
            job_id = %job.id,
            attempts,
            status = %job.status,
            progress = job.progress,
            "Job exceeded maximum execution time",
        );
        self.events.publish(MonitorEvent::JobTimedOut { job, attempts });
        PollOutcome::Failed(PollError::Timeout {
            job_id: self.job_id.clone(),
            attempts,
        })
    }

    async fn transport_failed(&self, attempt: u32, error: EtlApiError) -> PollOutcome {
        if self.jobs.finish(&self.job_id, &self.cancel).await.is_none() {
            return self.stopped(attempt);
        }

        tracing::error!(
            job_id = %self.job_id,
            attempt,
            error = %error,
            "Status request failed, monitoring abandoned",
        );
        self.events.publish(MonitorEvent::MonitorError {
            job_id: self.job_id.clone(),
            attempt,
            error: error.to_string(),
        });
        PollOutcome::Failed(PollError::Transport {
            job_id: self.job_id.clone(),
            attempt,
            source: error,
        })
    }
}
