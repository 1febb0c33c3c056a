//! Polling behaviour of `JobMonitor` against a scripted backend.
//!
//! Time is paused in every test, so the one-second poll interval elapses
//! instantly whenever all tasks are idle.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use etlwatch_client::{EtlApiError, EtlBackend};
use etlwatch_core::job::{JobSnapshot, JobStatus};
use etlwatch_core::request::EtlJobRequest;
use etlwatch_core::types::JobId;
use etlwatch_events::{EventBus, MonitorEvent};
use etlwatch_monitor::{JobMonitor, MonitorError, PollConfig, PollError, PollOutcome};
use tokio::sync::{broadcast, Notify};

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

type Scripted = Result<JobSnapshot, EtlApiError>;

/// Answers status requests from a fixed script and counts them.
#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicU32,
    starts: AtomicU32,
    /// When set, every status request waits for a permit before answering.
    gate: Option<Arc<Notify>>,
    /// Signalled when a status request arrives.
    arrived: Arc<Notify>,
}

impl ScriptedBackend {
    fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    fn gated(script: Vec<Scripted>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EtlBackend for ScriptedBackend {
    async fn start_job(&self, _request: &EtlJobRequest) -> Result<JobId, EtlApiError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok("etl_1714550400".to_string())
    }

    async fn fetch_status(&self, _job_id: &str) -> Result<JobSnapshot, EtlApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.arrived.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(EtlApiError::ApiError {
                status: 599,
                body: "script exhausted".into(),
            })
        })
    }
}

fn running(progress: i64) -> Scripted {
    Ok(JobSnapshot::new(JobStatus::Running, progress))
}

fn unavailable() -> Scripted {
    Err(EtlApiError::ApiError {
        status: 503,
        body: "Service Unavailable".into(),
    })
}

fn monitor(backend: Arc<ScriptedBackend>, max_attempts: u32) -> Arc<JobMonitor> {
    JobMonitor::new(
        backend,
        Arc::new(EventBus::default()),
        PollConfig::new(Duration::from_secs(1), max_attempts),
    )
}

fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Test: running, running, completed -> one terminal event, job removed
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn completes_after_scripted_progress() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        running(10),
        running(55),
        Ok(JobSnapshot::new(JobStatus::Completed, 100).with_total_records(500)),
    ]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let handle = monitor.watch("etl_1").await.unwrap();
    let outcome = handle.await.unwrap();

    let job = assert_matches!(outcome, PollOutcome::Completed(job) => job);
    assert_eq!(job.progress, 100);
    assert_eq!(job.total_records(), 500);
    assert_eq!(backend.calls(), 3);
    assert!(monitor.job("etl_1").await.is_none());
    assert!(monitor.active_jobs().await.is_empty());

    let events = drain(&mut rx);
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::JobProgress { job, .. } => Some(job.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![10, 55, 100]);

    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_matches!(
        terminal[0],
        MonitorEvent::JobCompleted { job } if job.progress == 100 && job.total_records() == 500
    );

    let history = monitor.recent_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "etl_1");
}

// ---------------------------------------------------------------------------
// Test: the interval separates consecutive requests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn waits_one_interval_between_polls() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        running(10),
        running(20),
        Ok(JobSnapshot::new(JobStatus::Completed, 100)),
    ]));
    let monitor = monitor(Arc::clone(&backend), 300);

    let start = tokio::time::Instant::now();
    monitor.watch("etl_1").await.unwrap().await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
}

// ---------------------------------------------------------------------------
// Test: no request is issued after a terminal status
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_status_stops_polling() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        running(30),
        Ok(JobSnapshot::new(JobStatus::Failed, 40).with_error("ORA-00942: table or view does not exist")),
        running(50),
    ]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let outcome = monitor.watch("etl_1").await.unwrap().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_matches!(
        outcome,
        PollOutcome::Failed(PollError::ServiceFailure { error, .. }) if error.starts_with("ORA-00942")
    );
    assert_eq!(backend.calls(), 2);

    let events = drain(&mut rx);
    assert_matches!(events.last(), Some(MonitorEvent::JobFailed { error, .. }) if error.starts_with("ORA-00942"));
    assert_eq!(monitor.recent_history().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: transport failure on the second request ends after two attempts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transport_error_on_second_request_stops_after_two_attempts() {
    let backend = Arc::new(ScriptedBackend::new(vec![running(10), unavailable(), running(20)]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let outcome = monitor.watch("etl_1").await.unwrap().await.unwrap();

    assert_matches!(
        outcome,
        PollOutcome::Failed(PollError::Transport { attempt: 2, source: EtlApiError::ApiError { status: 503, .. }, .. })
    );
    assert_eq!(backend.calls(), 2);
    assert!(monitor.job("etl_1").await.is_none());

    let errors: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, MonitorEvent::MonitorError { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(monitor.recent_history().await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: attempt budget exhausted -> timeout, no extra request
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn times_out_after_max_attempts() {
    let backend = Arc::new(ScriptedBackend::new(vec![running(10), running(20), running(30)]));
    let monitor = monitor(Arc::clone(&backend), 3);
    let mut rx = monitor.subscribe();

    let outcome = monitor.watch("etl_1").await.unwrap().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_matches!(outcome, PollOutcome::Failed(PollError::Timeout { attempts: 3, .. }));
    assert_eq!(backend.calls(), 3);
    assert!(monitor.job("etl_1").await.is_none());

    let events = drain(&mut rx);
    assert_matches!(events.last(), Some(MonitorEvent::JobTimedOut { attempts: 3, job }) if job.progress == 30);
}

// ---------------------------------------------------------------------------
// Test: pending counts as in flight
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn pending_status_keeps_polling() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok(JobSnapshot::new(JobStatus::Pending, 0)),
        running(50),
        Ok(JobSnapshot::new(JobStatus::Completed, 100)),
    ]));
    let monitor = monitor(Arc::clone(&backend), 300);

    let outcome = monitor.watch("etl_1").await.unwrap().await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(backend.calls(), 3);
}

// ---------------------------------------------------------------------------
// Test: stop between attempts prevents the next request
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_between_attempts_prevents_next_poll() {
    let backend = Arc::new(ScriptedBackend::new(vec![running(10), running(90)]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let handle = monitor.watch("etl_1").await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_matches!(first, MonitorEvent::JobProgress { attempt: 1, .. });

    let stopped = monitor.stop("etl_1").await.unwrap();
    assert_eq!(stopped.progress, 10);

    assert_matches!(handle.await.unwrap(), PollOutcome::Stopped);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(backend.calls(), 1);
    assert!(monitor.job("etl_1").await.is_none());

    let rest = drain(&mut rx);
    assert_eq!(rest.len(), 1);
    assert_matches!(&rest[0], MonitorEvent::JobStopped { job_id } if job_id == "etl_1");
}

// ---------------------------------------------------------------------------
// Test: a response arriving after stop is discarded
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn in_flight_response_after_stop_is_discarded() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(
        vec![Ok(JobSnapshot::new(JobStatus::Completed, 100))],
        Arc::clone(&gate),
    ));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let handle = monitor.watch("etl_1").await.unwrap();
    backend.arrived.notified().await;

    monitor.stop("etl_1").await.unwrap();
    gate.notify_one();

    assert_matches!(handle.await.unwrap(), PollOutcome::Stopped);
    assert!(monitor.recent_history().await.is_empty());

    let events = drain(&mut rx);
    assert!(events.iter().all(|e| !matches!(e, MonitorEvent::JobProgress { .. } | MonitorEvent::JobCompleted { .. })));
}

// ---------------------------------------------------------------------------
// Test: jobs poll independently
// ---------------------------------------------------------------------------

/// Answers each job id from its own script and counts requests per id.
#[derive(Default)]
struct PerJobBackend {
    scripts: Mutex<HashMap<JobId, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<JobId, u32>>,
}

impl PerJobBackend {
    fn new(scripts: Vec<(&str, Vec<Scripted>)>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(id, script)| (id.to_string(), script.into()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn calls(&self, job_id: &str) -> u32 {
        self.calls.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl EtlBackend for PerJobBackend {
    async fn start_job(&self, _request: &EtlJobRequest) -> Result<JobId, EtlApiError> {
        Ok("etl_unused".to_string())
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, EtlApiError> {
        *self.calls.lock().unwrap().entry(job_id.to_string()).or_default() += 1;
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| {
            Err(EtlApiError::ApiError {
                status: 599,
                body: format!("script exhausted for {job_id}"),
            })
        })
    }
}

#[tokio::test(start_paused = true)]
async fn separate_jobs_do_not_interfere() {
    let backend = Arc::new(PerJobBackend::new(vec![
        ("etl_a", vec![running(10), Err(EtlApiError::Rejected("boom".into()))]),
        (
            "etl_b",
            vec![
                running(10),
                running(40),
                running(70),
                Ok(JobSnapshot::new(JobStatus::Completed, 100).with_total_records(300)),
            ],
        ),
    ]));
    let config = PollConfig::new(Duration::from_secs(1), 10);
    let monitor = JobMonitor::new(
        Arc::clone(&backend) as Arc<dyn EtlBackend>,
        Arc::new(EventBus::default()),
        config,
    );
    let mut rx = monitor.subscribe();

    let a = monitor.watch("etl_a").await.unwrap();
    assert_matches!(
        monitor.watch("etl_a").await,
        Err(MonitorError::AlreadyMonitored(id)) if id == "etl_a"
    );
    let b = monitor.watch("etl_b").await.unwrap();

    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_matches!(
        a,
        PollOutcome::Failed(PollError::Transport { ref job_id, attempt: 2, source: EtlApiError::Rejected(ref msg) })
            if job_id == "etl_a" && msg == "boom"
    );
    let job = assert_matches!(b, PollOutcome::Completed(job) => job);
    assert_eq!(job.id, "etl_b");
    assert_eq!(job.total_records(), 300);

    assert_eq!(backend.calls("etl_a"), 2);
    assert_eq!(backend.calls("etl_b"), 4);
    assert!(monitor.active_jobs().await.is_empty());

    let events = drain(&mut rx);
    let monitor_errors: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::MonitorError { job_id, .. } => Some(job_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(monitor_errors, vec!["etl_a"]);
    let completed: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::JobCompleted { job } => Some(job.id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec!["etl_b"]);
}

// ---------------------------------------------------------------------------
// Test: submission validates, starts, and watches
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn submit_starts_and_watches_job() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        running(50),
        Ok(JobSnapshot::new(JobStatus::Completed, 100).with_total_records(12)),
    ]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let request = EtlJobRequest::new("SALES", "DW_SALES", vec!["erp_north".into()]);
    let (job_id, handle) = monitor.submit(&request).await.unwrap();

    assert_eq!(job_id, "etl_1714550400");
    assert!(handle.await.unwrap().is_completed());

    let first = rx.recv().await.unwrap();
    assert_matches!(first, MonitorEvent::JobStarted { job_id } if job_id == "etl_1714550400");
}

#[tokio::test(start_paused = true)]
async fn invalid_submission_is_never_sent() {
    let backend = Arc::new(ScriptedBackend::default());
    let monitor = monitor(Arc::clone(&backend), 300);

    let request = EtlJobRequest::new("", "DW_SALES", vec![]);
    let err = monitor.submit(&request).await.unwrap_err();

    assert_matches!(err, MonitorError::InvalidRequest(errors) if errors.len() == 2);
    assert_eq!(backend.starts.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: stop and shutdown edge cases
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stopping_unknown_job_is_an_error() {
    let monitor = monitor(Arc::new(ScriptedBackend::default()), 3);
    assert_matches!(monitor.stop("etl_x").await, Err(MonitorError::NotMonitored(_)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_tasks_without_terminal_events() {
    let backend = Arc::new(ScriptedBackend::new(vec![running(10), running(20)]));
    let monitor = monitor(Arc::clone(&backend), 300);
    let mut rx = monitor.subscribe();

    let handle = monitor.watch("etl_1").await.unwrap();
    let _ = rx.recv().await.unwrap();

    monitor.shutdown().await;

    assert_matches!(handle.await.unwrap(), PollOutcome::Stopped);
    assert!(drain(&mut rx).is_empty());
    assert!(monitor.active_jobs().await.is_empty());
    assert_matches!(monitor.watch("etl_2").await, Err(MonitorError::ShutDown));
}
