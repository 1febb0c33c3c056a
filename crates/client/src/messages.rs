//! Wire types for the ETL execution service JSON API.
//!
//! Every response carries a `success` flag; a `false` flag comes with a
//! human-readable `message`. Optional fields are tolerated as missing or
//! `null` because the service omits them freely.

use std::collections::BTreeMap;

use etlwatch_core::durations::service_duration;
use etlwatch_core::job::{JobSnapshot, JobStatus, LogEntry};
use etlwatch_core::types::JobId;
use serde::Deserialize;

/// Response of `POST /api/etl/start`.
#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    pub process_id: Option<JobId>,
    pub message: Option<String>,
}

/// Response of `GET /api/etl/status/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<i64>,
    pub current_step: Option<String>,
    #[serde(default)]
    pub logs: Option<Vec<LogEntry>>,
    /// Inserted record count per ERP source.
    #[serde(default)]
    pub results: Option<BTreeMap<String, i64>>,
    pub total_records: Option<i64>,
    pub error: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub message: Option<String>,
}

impl StatusResponse {
    /// Convert into the domain snapshot.
    ///
    /// Returns the name of the missing field if a successful response
    /// carries no status.
    pub fn into_snapshot(self) -> Result<JobSnapshot, &'static str> {
        let status = self.status.ok_or("status")?;
        Ok(JobSnapshot {
            status,
            progress: self.progress.unwrap_or(0),
            current_step: self.current_step.filter(|s| !s.is_empty()),
            logs: self.logs.unwrap_or_default(),
            per_source: self.results.unwrap_or_default(),
            total_records: self.total_records,
            error: self.error,
        })
    }
}

/// Response of `GET /api/etl/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    pub message: Option<String>,
}

/// One persisted job run, newest first in the service listing.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub process_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<i64>,
    pub current_step: Option<String>,
    pub total_records: Option<i64>,
    pub error: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub source_table: Option<String>,
    pub target_table: Option<String>,
    /// Comma-joined source names.
    pub sources: Option<String>,
    pub where_clause: Option<String>,
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub results: Option<BTreeMap<String, i64>>,
}

impl HistoryRecord {
    /// Run time as `HH:MM:SS`, if both ends are recorded.
    pub fn duration(&self) -> Option<String> {
        service_duration(self.start_time.as_deref(), self.end_time.as_deref())
    }

    pub fn source_list(&self) -> Vec<&str> {
        self.sources
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub active_processes: u32,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Response of `GET /api/stats/dashboard`.
#[derive(Debug, Deserialize)]
pub struct DashboardStatsResponse {
    pub success: bool,
    pub stats: Option<DashboardStats>,
    pub timestamp: Option<String>,
    pub message: Option<String>,
}

/// Record counts in the target database plus the last 24 hours of job activity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_records: i64,
    pub total_brands: i64,
    pub total_tables: i64,
    pub brand_stats: Vec<BrandStat>,
    pub table_stats: Vec<TableStat>,
    pub recent_activity: RecentActivity,
}

/// Loaded record count for one ERP brand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrandStat {
    pub brand_etl: i64,
    pub brand_name: String,
    pub record_count: i64,
}

/// Loaded record count for one target table, largest first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableStat {
    pub table_name: String,
    pub record_count: i64,
    pub brand_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecentActivity {
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub running_jobs: i64,
    pub total_processed_records: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_with_nulls_converts() {
        let raw = r#"{
            "success": true,
            "status": "running",
            "progress": 55,
            "current_step": "",
            "logs": null,
            "results": null,
            "total_records": 0,
            "error": null,
            "start_time": "2024-05-01T08:00:00",
            "end_time": null
        }"#;
        let resp: StatusResponse = serde_json::from_str(raw).unwrap();
        let snapshot = resp.into_snapshot().unwrap();

        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.progress, 55);
        assert!(snapshot.current_step.is_none());
        assert!(snapshot.logs.is_empty());
    }

    #[test]
    fn status_response_without_status_is_rejected() {
        let resp: StatusResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(resp.into_snapshot().unwrap_err(), "status");
    }

    #[test]
    fn history_record_derives_duration_and_sources() {
        let raw = r#"{
            "process_id": "etl_1714550400",
            "status": "completed",
            "progress": 100,
            "total_records": 1200,
            "start_time": "2024-05-01T08:00:00.500000",
            "end_time": "2024-05-01T09:01:05.500000",
            "source_table": "SALES",
            "target_table": "DW_SALES",
            "sources": "erp_north, erp_south,",
            "results": {"erp_north": 700, "erp_south": 500}
        }"#;
        let record: HistoryRecord = serde_json::from_str(raw).unwrap();

        assert_eq!(record.duration().as_deref(), Some("01:01:05"));
        assert_eq!(record.source_list(), vec!["erp_north", "erp_south"]);
    }

    #[test]
    fn empty_dashboard_stats_default_to_zero() {
        let raw = r#"{
            "success": true,
            "stats": {"total_records": 0, "recent_activity": {"total_jobs": 0}},
            "timestamp": "2024-05-01T08:00:00"
        }"#;
        let resp: DashboardStatsResponse = serde_json::from_str(raw).unwrap();
        let stats = resp.stats.unwrap();

        assert!(stats.brand_stats.is_empty());
        assert!(stats.table_stats.is_empty());
        assert_eq!(stats.recent_activity, RecentActivity::default());
    }
}
