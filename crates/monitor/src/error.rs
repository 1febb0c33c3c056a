use etlwatch_client::EtlApiError;
use etlwatch_core::types::JobId;

/// Why polling of a job ended without the job completing.
///
/// Every variant is terminal for the affected job and none is retried.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The status request failed or the service answered with an error.
    #[error("Status request for job {job_id} failed on attempt {attempt}: {source}")]
    Transport {
        job_id: JobId,
        attempt: u32,
        #[source]
        source: EtlApiError,
    },

    /// The attempt budget ran out while the job was still in flight.
    #[error("Job {job_id} did not finish within {attempts} status checks")]
    Timeout { job_id: JobId, attempts: u32 },

    /// The service reported the job as failed.
    #[error("Job {job_id} failed: {error}")]
    ServiceFailure { job_id: JobId, error: String },
}

/// Errors from [`JobMonitor`](crate::JobMonitor) operations.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A live polling task already exists for this id.
    #[error("Job {0} is already being monitored")]
    AlreadyMonitored(JobId),

    /// No live polling task exists for this id.
    #[error("Job {0} is not being monitored")]
    NotMonitored(JobId),

    /// The submission request failed validation and was not sent.
    #[error("Invalid job request: {}", .0.join("; "))]
    InvalidRequest(Vec<String>),

    /// The service did not accept the submission.
    #[error("Failed to start ETL job: {0}")]
    Submit(#[from] EtlApiError),

    /// The monitor has been shut down.
    #[error("Job monitor is shut down")]
    ShutDown,
}
