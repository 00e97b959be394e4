//! Metrics definitions for the session controller.
//!
//! All metrics follow Prometheus naming conventions:
//! - `sc_` prefix for Session Controller
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `outcome`: success, error, timeout, cancelled
//! - `trigger`: leave, end_session, shutdown, join_failure
//! - `operation`: bounded by controller operations (~8 values)
//! - `error_type`: bounded by `SessionError::error_type_label`

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a finished join attempt.
///
/// Metrics: `sc_join_attempts_total`, `sc_join_duration_seconds`
/// Labels: `outcome` (success, error, timeout, cancelled)
pub fn record_join_attempt(outcome: &'static str, duration: Duration) {
    counter!("sc_join_attempts_total", "outcome" => outcome).increment(1);
    histogram!("sc_join_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}

/// Record a teardown.
///
/// Metric: `sc_teardowns_total`
/// Labels: `trigger` (leave, end_session, shutdown, join_failure)
pub fn record_teardown(trigger: &'static str) {
    counter!("sc_teardowns_total", "trigger" => trigger).increment(1);
}

/// Tracks added to a remote registry.
///
/// Metric: `sc_remote_tracks_active`
///
/// The gauge is shared by every controller in the process, so registries
/// report deltas rather than their own absolute count.
pub fn remote_tracks_added(count: usize) {
    // usize to f64 conversion is safe for realistic track counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("sc_remote_tracks_active").increment(count as f64);
}

/// Tracks removed from a remote registry.
///
/// Metric: `sc_remote_tracks_active`
pub fn remote_tracks_removed(count: usize) {
    if count == 0 {
        return;
    }
    #[allow(clippy::cast_precision_loss)]
    gauge!("sc_remote_tracks_active").decrement(count as f64);
}

/// Record an error returned to a caller of the controller handle.
///
/// Metric: `sc_errors_total`
/// Labels: `operation`, `error_type`
pub fn record_error(operation: &'static str, error_type: &'static str) {
    counter!(
        "sc_errors_total",
        "operation" => operation,
        "error_type" => error_type
    )
    .increment(1);
}

/// Record the result of an end-of-session report.
///
/// Metric: `sc_termination_reports_total`
/// Labels: `outcome` (success, error)
pub fn record_termination_report(outcome: &'static str) {
    counter!("sc_termination_reports_total", "outcome" => outcome).increment(1);
}
