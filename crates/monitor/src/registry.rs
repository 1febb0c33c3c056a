//! Registry of jobs that are currently being polled.
//!
//! The registry is the only mutable state shared between polling tasks
//! and the rest of the application. Each entry pairs the [`Job`] with the
//! [`CancellationToken`] of the task that owns it. A task may mutate or
//! remove an entry only while its own token is live, so a task whose job
//! was stopped (and possibly re-watched under a new task) can never touch
//! the entry again.

use std::collections::HashMap;

use etlwatch_core::job::{Job, JobSnapshot, StatusTransition};
use etlwatch_core::types::JobId;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;

/// Internal bookkeeping for a single monitored job.
struct TrackedJob {
    job: Job,
    /// Token of the owning polling task.
    cancel: CancellationToken,
}

/// Active jobs indexed by id.
#[derive(Default)]
pub struct ActiveJobs {
    jobs: RwLock<HashMap<JobId, TrackedJob>>,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job owned by the task holding `cancel`.
    ///
    /// Fails if the id already has a live entry, or if `cancel` was
    /// already cancelled (the monitor is shutting down and may have
    /// drained the registry).
    pub async fn insert(&self, job: Job, cancel: CancellationToken) -> Result<(), MonitorError> {
        let mut jobs = self.jobs.write().await;
        if cancel.is_cancelled() {
            return Err(MonitorError::ShutDown);
        }
        if jobs.contains_key(&job.id) {
            return Err(MonitorError::AlreadyMonitored(job.id));
        }
        jobs.insert(job.id.clone(), TrackedJob { job, cancel });
        Ok(())
    }

    /// Snapshot of one active job.
    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).map(|t| t.job.clone())
    }

    /// Snapshots of all active jobs, oldest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .map(|t| t.job.clone())
            .collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    pub async fn contains(&self, job_id: &str) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    /// Whether the task holding `cancel` still owns `job_id`.
    pub async fn is_current(&self, job_id: &str, cancel: &CancellationToken) -> bool {
        !cancel.is_cancelled() && self.contains(job_id).await
    }

    /// Apply a poll result to the job if the caller still owns it.
    ///
    /// Returns the updated job and the status transition, or `None` when
    /// the job was stopped in the meantime.
    pub async fn apply(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        snapshot: JobSnapshot,
    ) -> Option<(Job, StatusTransition)> {
        let mut jobs = self.jobs.write().await;
        if cancel.is_cancelled() {
            return None;
        }
        let tracked = jobs.get_mut(job_id)?;
        let transition = tracked.job.apply_snapshot(snapshot);
        Some((tracked.job.clone(), transition))
    }

    /// Remove the job at the end of its polling task.
    ///
    /// Only the owning task may do this; returns `None` if the job was
    /// already stopped.
    pub async fn finish(&self, job_id: &str, cancel: &CancellationToken) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        if cancel.is_cancelled() {
            return None;
        }
        let tracked = jobs.remove(job_id)?;
        tracked.cancel.cancel();
        Some(tracked.job)
    }

    /// Remove the job on behalf of the user and cancel its task.
    pub async fn stop(&self, job_id: &str) -> Option<Job> {
        let tracked = self.jobs.write().await.remove(job_id)?;
        tracked.cancel.cancel();
        Some(tracked.job)
    }

    /// Remove every job and cancel every task.
    pub async fn drain(&self) -> Vec<Job> {
        let mut jobs = self.jobs.write().await;
        let drained = jobs
            .drain()
            .map(|(_, tracked)| {
                tracked.cancel.cancel();
                tracked.job
            })
            .collect();
        drained
    }
}
