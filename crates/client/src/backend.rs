//! Seam between the job monitor and the execution service.
//!
//! The monitor only needs to start jobs and read their status. Hiding
//! that behind [`EtlBackend`] lets tests drive the poller with scripted
//! responses instead of a live service.

use async_trait::async_trait;
use etlwatch_core::job::JobSnapshot;
use etlwatch_core::request::EtlJobRequest;
use etlwatch_core::types::JobId;

use crate::api::{EtlApi, EtlApiError};

/// Operations the monitor performs against the execution service.
#[async_trait]
pub trait EtlBackend: Send + Sync {
    /// Submit a job and return its service-assigned id.
    async fn start_job(&self, request: &EtlJobRequest) -> Result<JobId, EtlApiError>;

    /// Issue one status request for `job_id`.
    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, EtlApiError>;
}

#[async_trait]
impl EtlBackend for EtlApi {
    async fn start_job(&self, request: &EtlJobRequest) -> Result<JobId, EtlApiError> {
        EtlApi::start_job(self, request).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, EtlApiError> {
        self.job_status(job_id).await
    }
}
