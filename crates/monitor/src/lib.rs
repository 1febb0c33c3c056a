//! ETL job status monitoring.
//!
//! [`JobMonitor`] owns the registry of active jobs and runs one
//! cancellable polling task per job id against an
//! [`EtlBackend`](etlwatch_client::EtlBackend). Every update and terminal
//! outcome is published on the shared
//! [`EventBus`](etlwatch_events::EventBus).

pub mod config;
pub mod error;
pub mod history;
pub mod poller;
pub mod registry;

pub use config::PollConfig;
pub use error::{MonitorError, PollError};
pub use poller::{JobMonitor, PollOutcome};
