//! Metrics for request latency and realtime traffic.
//!
//! Recorded through the `metrics` facade; no exporter is installed by this
//! crate, so recording is a no-op until an embedding binary installs one.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Realtime connections opened counter metric name.
pub const METRIC_REALTIME_CONNECTIONS: &str = "realtime_connections_total";
/// Realtime connections currently open gauge metric name.
pub const METRIC_REALTIME_ACTIVE: &str = "realtime_connections_active";
/// Realtime messages broadcast counter metric name.
pub const METRIC_REALTIME_BROADCASTS: &str = "realtime_messages_broadcast_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(
        METRIC_HTTP_REQUESTS,
        "Total number of HTTP requests by endpoint and outcome"
    );
    describe_counter!(
        METRIC_REALTIME_CONNECTIONS,
        "Total number of realtime connections accepted"
    );
    describe_gauge!(
        METRIC_REALTIME_ACTIVE,
        "Number of realtime connections currently open"
    );
    describe_counter!(
        METRIC_REALTIME_BROADCASTS,
        "Total number of realtime messages broadcast"
    );

    debug!("Metrics initialized");
}

/// Record HTTP request latency and outcome.
pub fn record_http_request(start: Instant, endpoint: &str, outcome: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
    counter!(METRIC_HTTP_REQUESTS, "endpoint" => endpoint.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Increment realtime connections counter.
pub fn inc_realtime_connections() {
    counter!(METRIC_REALTIME_CONNECTIONS).increment(1);
}

/// Set the number of open realtime connections.
pub fn set_realtime_active(active: usize) {
    gauge!(METRIC_REALTIME_ACTIVE).set(active as f64);
}

/// Increment realtime broadcasts counter.
pub fn inc_realtime_broadcasts() {
    counter!(METRIC_REALTIME_BROADCASTS).increment(1);
}
