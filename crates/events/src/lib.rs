//! Job monitoring event bus and user notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`MonitorEvent`]: every state change the monitor reports.
//! - [`Notification`] / [`Notifier`]: the user-facing view of those
//!   events, emitted through `tracing`.

pub mod bus;
pub mod notification;

pub use bus::{EventBus, MonitorEvent};
pub use notification::{Notification, Notifier, Severity};
