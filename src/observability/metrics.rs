//! Metrics collection.
//!
//! # Metrics
//! - `request_mux_dispatch_total` (counter): dispatches by stage, outcome
//! - `request_mux_action_failures_total` (counter): failed actions by stage
//! - `request_mux_invalid_pattern_total` (counter): requests aborted by a bad pattern
//! - `request_mux_resubscribe_total` (counter): host subscription (re)installs
//! - `request_mux_listeners` (gauge): registered listeners per stage
//!
//! # Design Decisions
//! - Uses the `metrics` facade; recording is a no-op without an installed recorder
//! - Labels are static stage names to keep cardinality bounded

use crate::stage::Stage;

pub fn record_dispatch(stage: Stage, outcome: &'static str) {
    metrics::counter!(
        "request_mux_dispatch_total",
        "stage" => stage.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_action_failure(stage: Stage) {
    metrics::counter!("request_mux_action_failures_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_invalid_pattern(stage: Stage) {
    metrics::counter!("request_mux_invalid_pattern_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_resubscribe(stage: Stage) {
    metrics::counter!("request_mux_resubscribe_total", "stage" => stage.as_str()).increment(1);
}

pub fn record_listener_count(stage: Stage, count: usize) {
    metrics::gauge!("request_mux_listeners", "stage" => stage.as_str()).set(count as f64);
}
