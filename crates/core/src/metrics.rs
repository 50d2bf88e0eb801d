//! Metrics definitions for the API service.
//!
//! This module defines all metrics used throughout the service.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "graphql_requests_total",
        "Total number of GraphQL requests received"
    );
    describe_counter!(
        "graphql_requests_rejected_total",
        "Total number of requests rejected by admission control before execution"
    );
    describe_histogram!(
        "list_query_duration_seconds",
        "Time taken to serve a paginated list query in seconds"
    );
}

/// Record a received GraphQL request.
pub fn record_request() {
    counter!("graphql_requests_total").increment(1);
}

/// Record a request rejected before execution.
///
/// # Arguments
/// * `reason` - The rejection reason ("batch_limit" or "depth_limit")
pub fn record_request_rejected(reason: &str) {
    counter!("graphql_requests_rejected_total", "reason" => reason.to_string()).increment(1);
}

/// Record the duration of a paginated list query.
///
/// # Arguments
/// * `entity` - The queried entity type (e.g. "issues")
pub fn record_list_query_duration(entity: &'static str, duration_secs: f64) {
    histogram!("list_query_duration_seconds", "entity" => entity).record(duration_secs);
}
