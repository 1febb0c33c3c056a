//! HTTP client for the ETL execution service.
//!
//! Provides typed wire messages, a `reqwest` wrapper over the service
//! endpoints, and the [`EtlBackend`](backend::EtlBackend) trait the
//! monitor polls through.

pub mod api;
pub mod backend;
pub mod messages;

pub use api::{EtlApi, EtlApiError};
pub use backend::EtlBackend;
