//! ETL job submission request.
//!
//! Mirrors the JSON body accepted by `POST /api/etl/start`. Field names
//! are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default number of rows copied per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 5000;

/// Default per-query timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Default execution mode.
pub const EXECUTION_MODE_IMMEDIATE: &str = "immediate";

/// Parameters for one ETL run from a source table into a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtlJobRequest {
    pub source_table: String,
    pub target_table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// ERP sources to extract from; at least one is required.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_execution_mode")]
    pub execution_mode: String,
    #[serde(default)]
    pub backup_before: bool,
    #[serde(default)]
    pub validate_data: bool,
    #[serde(default)]
    pub notify_on_complete: bool,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_SECS
}

fn default_execution_mode() -> String {
    EXECUTION_MODE_IMMEDIATE.to_string()
}

impl EtlJobRequest {
    /// A request with defaults for everything except the tables and sources.
    pub fn new(
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            where_clause: None,
            sources,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT_SECS,
            execution_mode: default_execution_mode(),
            backup_before: false,
            validate_data: false,
            notify_on_complete: false,
        }
    }

    /// Check the request before it is sent.
    ///
    /// Returns an empty `Vec` if valid; otherwise a list of human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.source_table.trim().is_empty() {
            errors.push("Source table is required".to_string());
        }

        if self.target_table.trim().is_empty() {
            errors.push("Target table is required".to_string());
        }

        if self.sources.iter().all(|s| s.trim().is_empty()) {
            errors.push("At least one ERP source must be selected".to_string());
        }

        if self.batch_size == 0 {
            errors.push("Batch size must be greater than zero".to_string());
        }

        errors
    }

    /// Parse a request from JSON and validate it in one step.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let request: Self = serde_json::from_str(raw)
            .map_err(|e| CoreError::Validation(format!("Malformed job request: {e}")))?;

        let errors = request.validate();
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors.join("; ")));
        }

        Ok(request)
    }
}
