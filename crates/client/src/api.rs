//! REST API client for the ETL execution service.
//!
//! Wraps the service's HTTP endpoints (job start, status, history,
//! dashboard statistics, health) using [`reqwest`].

use std::time::Duration;

use etlwatch_core::job::JobSnapshot;
use etlwatch_core::request::EtlJobRequest;
use etlwatch_core::types::JobId;

use crate::messages::{
    DashboardStats, DashboardStatsResponse, HealthResponse, HistoryRecord, HistoryResponse,
    StartResponse, StatusResponse,
};

/// HTTP client for a single ETL execution service.
#[derive(Clone)]
pub struct EtlApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the ETL REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum EtlApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("ETL service error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered `success: false`.
    #[error("ETL service rejected the request: {0}")]
    Rejected(String),

    /// A successful response lacked a required field.
    #[error("ETL service response is missing '{0}'")]
    MissingField(&'static str),
}

impl EtlApiError {
    /// The HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            EtlApiError::ApiError { status, .. } => Some(*status),
            EtlApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl EtlApi {
    /// Create a new API client for an execution service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://127.0.0.1:5000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EtlApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Base URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Start an ETL job.
    ///
    /// Sends `POST /api/etl/start` and returns the service-assigned job id.
    pub async fn start_job(&self, request: &EtlJobRequest) -> Result<JobId, EtlApiError> {
        let response = self
            .client
            .post(format!("{}/api/etl/start", self.api_url))
            .json(request)
            .send()
            .await?;

        let body: StartResponse = Self::parse_response(response).await?;
        if !body.success {
            return Err(EtlApiError::Rejected(
                body.message
                    .unwrap_or_else(|| "Failed to start ETL job".to_string()),
            ));
        }

        let job_id = body.process_id.ok_or(EtlApiError::MissingField("process_id"))?;
        tracing::info!(job_id = %job_id, "ETL job accepted by service");
        Ok(job_id)
    }

    /// Fetch the current state of a job.
    ///
    /// Sends `GET /api/etl/status/{job_id}`.
    pub async fn job_status(&self, job_id: &str) -> Result<JobSnapshot, EtlApiError> {
        let response = self
            .client
            .get(format!("{}/api/etl/status/{}", self.api_url, job_id))
            .send()
            .await?;

        let body: StatusResponse = Self::parse_response(response).await?;
        if !body.success {
            return Err(EtlApiError::Rejected(
                body.message
                    .unwrap_or_else(|| format!("Status unavailable for job {job_id}")),
            ));
        }

        body.into_snapshot().map_err(EtlApiError::MissingField)
    }

    /// List recent job runs recorded by the service, newest first.
    ///
    /// Sends `GET /api/etl/history`.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>, EtlApiError> {
        let response = self
            .client
            .get(format!("{}/api/etl/history", self.api_url))
            .send()
            .await?;

        let body: HistoryResponse = Self::parse_response(response).await?;
        if !body.success {
            return Err(EtlApiError::Rejected(
                body.message
                    .unwrap_or_else(|| "Failed to load job history".to_string()),
            ));
        }

        Ok(body.history)
    }

    /// Record counts and recent job activity for the dashboard.
    ///
    /// Sends `GET /api/stats/dashboard`.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, EtlApiError> {
        let response = self
            .client
            .get(format!("{}/api/stats/dashboard", self.api_url))
            .send()
            .await?;

        let body: DashboardStatsResponse = Self::parse_response(response).await?;
        if !body.success {
            return Err(EtlApiError::Rejected(
                body.message
                    .unwrap_or_else(|| "Failed to load dashboard statistics".to_string()),
            ));
        }

        body.stats.ok_or(EtlApiError::MissingField("stats"))
    }

    /// Check that the service is up.
    ///
    /// Sends `GET /api/health`.
    pub async fn health(&self) -> Result<HealthResponse, EtlApiError> {
        let response = self
            .client
            .get(format!("{}/api/health", self.api_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`EtlApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EtlApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EtlApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EtlApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
