//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub between the job monitor and
//! everything that presents job state. It is designed to be shared via
//! `Arc<EventBus>` across the application.

use etlwatch_core::job::Job;
use etlwatch_core::job_events::{
    MSG_TYPE_JOB_COMPLETED, MSG_TYPE_JOB_FAILED, MSG_TYPE_JOB_PROGRESS, MSG_TYPE_JOB_STARTED,
    MSG_TYPE_JOB_STOPPED, MSG_TYPE_JOB_TIMEOUT, MSG_TYPE_MONITOR_ERROR,
};
use etlwatch_core::types::JobId;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// A state change reported by the job monitor.
///
/// Serializes with a `type` tag equal to [`MonitorEvent::event_type`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// The service accepted a submitted job.
    JobStarted { job_id: JobId },

    /// A status poll succeeded and the job was updated.
    JobProgress {
        job: Job,
        /// 1-based poll attempt that produced this update.
        attempt: u32,
    },

    /// The job reached `completed`.
    JobCompleted { job: Job },

    /// The service reported the job as `failed`.
    JobFailed { job: Job, error: String },

    /// The attempt budget ran out while the job was still in flight.
    #[serde(rename = "job_timeout")]
    JobTimedOut { job: Job, attempts: u32 },

    /// A status request failed; the job is no longer monitored.
    MonitorError {
        job_id: JobId,
        attempt: u32,
        error: String,
    },

    /// The user stopped monitoring the job.
    JobStopped { job_id: JobId },
}

impl MonitorEvent {
    /// Wire name of the event, e.g. `"job_progress"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::JobStarted { .. } => MSG_TYPE_JOB_STARTED,
            MonitorEvent::JobProgress { .. } => MSG_TYPE_JOB_PROGRESS,
            MonitorEvent::JobCompleted { .. } => MSG_TYPE_JOB_COMPLETED,
            MonitorEvent::JobFailed { .. } => MSG_TYPE_JOB_FAILED,
            MonitorEvent::JobTimedOut { .. } => MSG_TYPE_JOB_TIMEOUT,
            MonitorEvent::MonitorError { .. } => MSG_TYPE_MONITOR_ERROR,
            MonitorEvent::JobStopped { .. } => MSG_TYPE_JOB_STOPPED,
        }
    }

    /// Id of the job the event is about.
    pub fn job_id(&self) -> &str {
        match self {
            MonitorEvent::JobStarted { job_id }
            | MonitorEvent::MonitorError { job_id, .. }
            | MonitorEvent::JobStopped { job_id } => job_id,
            MonitorEvent::JobProgress { job, .. }
            | MonitorEvent::JobCompleted { job }
            | MonitorEvent::JobFailed { job, .. }
            | MonitorEvent::JobTimedOut { job, .. } => &job.id,
        }
    }

    /// Whether this event ends monitoring of its job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MonitorEvent::JobCompleted { .. }
                | MonitorEvent::JobFailed { .. }
                | MonitorEvent::JobTimedOut { .. }
                | MonitorEvent::MonitorError { .. }
                | MonitorEvent::JobStopped { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`MonitorEvent`].
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: MonitorEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
