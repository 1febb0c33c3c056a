//! Shared domain types for the ETL job monitor.
//!
//! Holds the job entity and its status machine, the submission request
//! model, error types, and display helpers used by every other crate.

pub mod durations;
pub mod error;
pub mod job;
pub mod job_events;
pub mod request;
pub mod types;
