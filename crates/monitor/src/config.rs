use std::time::Duration;

/// Default delay between two status requests for the same job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default attempt budget: 300 polls at one second is five minutes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// Polling parameters shared by every job the monitor watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between the end of one poll and the start of the next.
    pub interval: Duration,
    /// Upper bound on status requests per job, always at least 1.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `ETL_POLL_INTERVAL_MS`  | `1000`  |
    /// | `ETL_POLL_MAX_ATTEMPTS` | `300`   |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let interval = lookup("ETL_POLL_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let max_attempts = lookup("ETL_POLL_MAX_ATTEMPTS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        Self::new(interval, max_attempts)
    }
}
