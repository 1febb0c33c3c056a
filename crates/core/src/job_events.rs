//! Event type names for job monitoring notifications.
//!
//! Returned by `MonitorEvent::event_type` and used as the `type` field
//! when events are serialized for external consumers.

/// A job was accepted by the execution service.
pub const MSG_TYPE_JOB_STARTED: &str = "job_started";

/// Progress update after a successful status poll.
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";

/// Job completed successfully.
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";

/// The service reported the job as failed.
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// The polling budget ran out before the job reached a terminal state.
pub const MSG_TYPE_JOB_TIMEOUT: &str = "job_timeout";

/// A status request failed; monitoring of the job was abandoned.
pub const MSG_TYPE_MONITOR_ERROR: &str = "monitor_error";

/// Monitoring was stopped by the user.
pub const MSG_TYPE_JOB_STOPPED: &str = "job_stopped";
