use std::time::Duration;

use etlwatch_monitor::PollConfig;

/// Service URL used when `ETL_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local execution service.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Base URL of the ETL execution service.
    pub api_url: String,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Polling interval and attempt budget.
    pub poll: PollConfig,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `ETL_API_URL`           | `http://127.0.0.1:5000` |
    /// | `ETL_HTTP_TIMEOUT_SECS` | `30`                    |
    /// | `ETL_POLL_INTERVAL_MS`  | `1000`                  |
    /// | `ETL_POLL_MAX_ATTEMPTS` | `300`                   |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("ETL_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let http_timeout_secs: u64 = lookup("ETL_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            api_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            poll: PollConfig::from_lookup(&lookup),
        }
    }
}
