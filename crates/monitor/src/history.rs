//! Jobs that finished during this session, newest first.

use std::collections::VecDeque;

use etlwatch_core::job::Job;
use tokio::sync::RwLock;

/// Matches the number of runs the service returns from its history endpoint.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Bounded in-memory list of completed and failed jobs.
pub struct JobHistory {
    entries: RwLock<VecDeque<Job>>,
    capacity: usize,
}

impl JobHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Add a finished job, evicting the oldest entry when full.
    pub async fn record(&self, job: Job) {
        let mut entries = self.entries.write().await;
        entries.push_front(job);
        entries.truncate(self.capacity);
    }

    /// All recorded jobs, newest first.
    pub async fn recent(&self) -> Vec<Job> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
