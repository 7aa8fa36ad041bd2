//! Metrics collection and exposition.
//!
//! # Metrics
//! - `calculator_requests_total` (counter): HTTP requests by path, status
//! - `calculator_request_duration_seconds` (histogram): HTTP latency by path
//! - `calculator_operations_total` (counter): handler calls by operation, outcome
//! - `calculator_operation_duration_seconds` (histogram): handler latency by operation
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one HTTP request.
pub fn record_request(path: &str, status: u16, start: Instant) {
    metrics::counter!(
        "calculator_requests_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("calculator_request_duration_seconds", "path" => path.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one instrumented handler call.
pub fn record_operation(operation: &'static str, outcome: &'static str, duration: Duration) {
    metrics::counter!("calculator_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("calculator_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}
