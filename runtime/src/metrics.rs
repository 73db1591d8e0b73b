//! Metric descriptions for the operations this crate orchestrates.
//!
//! No HTTP exporter lives here — scraping/exposition is left to the
//! embedding application, which installs whatever `metrics::Recorder` it
//! wants (Prometheus or otherwise) before calling [`register_metrics`].
//! This crate only describes and records against the global recorder via
//! the `metrics` crate's macros.

use metrics::{describe_counter, describe_histogram};

/// Register descriptions for every metric this crate emits. Call once at
/// startup, after installing a `metrics::Recorder`.
pub fn register_metrics() {
    describe_counter!(
        "dcb_decision_retry_attempts_total",
        "Total number of ExecuteDecision retry attempts due to AppendConditionFailed"
    );
    describe_counter!(
        "dcb_decision_retry_successes_total",
        "Total number of ExecuteDecision calls that succeeded after at least one retry"
    );
    describe_counter!(
        "dcb_decision_retry_exhausted_total",
        "Total number of ExecuteDecision calls that exhausted their retry budget"
    );
    describe_counter!(
        "dcb_daemon_poll_ticks_total",
        "Total number of projection daemon poll iterations"
    );
    describe_counter!(
        "dcb_daemon_events_folded_total",
        "Total number of events folded into projections across all poll ticks"
    );
    describe_histogram!(
        "dcb_daemon_poll_duration_seconds",
        "Time taken to complete one projection daemon poll iteration"
    );
    describe_histogram!(
        "dcb_daemon_rebuild_duration_seconds",
        "Time taken to rebuild a single projection from scratch"
    );
}
