//! Elapsed-time formatting for progress lines, notifications and the
//! history table.

use chrono::NaiveDateTime;

/// Format a number of elapsed seconds as `MM:SS`.
///
/// Minutes are not wrapped into hours, so a 75 minute job renders as
/// `75:00`. Negative input (clock skew) renders as `00:00`.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format the span between two instants as `HH:MM:SS`.
pub fn format_span(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Parse a service timestamp (ISO-8601 without offset, optional fraction).
pub fn parse_service_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// `HH:MM:SS` between two service timestamps, `None` if either is
/// missing or unparseable.
pub fn service_duration(start: Option<&str>, end: Option<&str>) -> Option<String> {
    let start = parse_service_time(start?)?;
    let end = parse_service_time(end?)?;
    Some(format_span((end - start).num_seconds()))
}
