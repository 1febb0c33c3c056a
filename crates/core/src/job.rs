//! The monitored ETL job entity and its status machine.
//!
//! A [`Job`] is created when monitoring starts and is refreshed from a
//! [`JobSnapshot`] after every successful status poll. Status only moves
//! forward (`pending -> running -> completed | failed`); reports that
//! would move it backwards are ignored while the rest of the snapshot is
//! still applied.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Fallback error detail when the service reports a failure without one.
pub const UNKNOWN_FAILURE: &str = "An unknown error occurred.";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Execution status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` end the job; nothing is polled afterwards.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// Staying put is always allowed. Terminal states never change.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self == next || (!self.is_terminal() && next.rank() > self.rank())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Severity attached to a service log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    /// Any level the service invents later.
    #[serde(other)]
    Other,
}

/// One line of the service-side job log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock time on the service, formatted `HH:MM:SS`.
    pub timestamp: String,
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Snapshot and result summary
// ---------------------------------------------------------------------------

/// Outcome details, present once the job is terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_records: i64,
    /// Inserted record count per ERP source.
    pub per_source: BTreeMap<String, i64>,
    pub error: Option<String>,
}

/// Service-reported state of a job at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: i64,
    pub current_step: Option<String>,
    pub logs: Vec<LogEntry>,
    pub per_source: BTreeMap<String, i64>,
    pub total_records: Option<i64>,
    pub error: Option<String>,
}

impl JobSnapshot {
    /// Minimal snapshot with only status and progress set.
    pub fn new(status: JobStatus, progress: i64) -> Self {
        Self {
            status,
            progress,
            current_step: None,
            logs: Vec::new(),
            per_source: BTreeMap::new(),
            total_records: None,
            error: None,
        }
    }

    pub fn with_total_records(mut self, total: i64) -> Self {
        self.total_records = Some(total);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_logs(mut self, logs: Vec<LogEntry>) -> Self {
        self.logs = logs;
        self
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// What happened to the job status when a snapshot was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Unchanged,
    Advanced { from: JobStatus, to: JobStatus },
    /// The reported status would have moved the job backwards; kept `current`.
    Ignored {
        current: JobStatus,
        reported: JobStatus,
    },
}

/// One in-flight or finished ETL execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub started_at: Timestamp,
    pub status: JobStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub current_step: Option<String>,
    pub logs: Vec<LogEntry>,
    pub result: Option<ResultSummary>,
}

impl Job {
    /// A freshly submitted job in the `pending` state.
    pub fn new(id: impl Into<JobId>, started_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            started_at,
            status: JobStatus::Pending,
            progress: 0,
            current_step: None,
            logs: Vec::new(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Refresh the job from a service snapshot.
    ///
    /// Progress is clamped to `0..=100` but may go down. Logs are replaced
    /// wholesale. The result summary is filled in only once the job is
    /// terminal.
    pub fn apply_snapshot(&mut self, snapshot: JobSnapshot) -> StatusTransition {
        let transition = if snapshot.status == self.status {
            StatusTransition::Unchanged
        } else if self.status.can_transition_to(snapshot.status) {
            let from = self.status;
            self.status = snapshot.status;
            StatusTransition::Advanced {
                from,
                to: snapshot.status,
            }
        } else {
            StatusTransition::Ignored {
                current: self.status,
                reported: snapshot.status,
            }
        };

        self.progress = snapshot.progress.clamp(0, 100) as u8;
        if snapshot.current_step.is_some() {
            self.current_step = snapshot.current_step;
        }
        self.logs = snapshot.logs;

        if self.status.is_terminal() {
            let error = match self.status {
                JobStatus::Failed => {
                    Some(snapshot.error.unwrap_or_else(|| UNKNOWN_FAILURE.to_string()))
                }
                _ => snapshot.error,
            };
            self.result = Some(ResultSummary {
                total_records: snapshot.total_records.unwrap_or(0),
                per_source: snapshot.per_source,
                error,
            });
        }

        transition
    }

    /// Record count reported by the service, zero until the job finishes.
    pub fn total_records(&self) -> i64 {
        self.result.as_ref().map_or(0, |r| r.total_records)
    }

    /// Error detail for a failed job.
    pub fn failure_detail(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.error.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
