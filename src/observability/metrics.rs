//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, batch outcomes, admission)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `fanout_http_requests_total` (counter): inbound requests by status
//! - `fanout_http_request_duration_seconds` (histogram): inbound latency
//! - `fanout_batches_total` (counter): batches by error flag and kind
//! - `fanout_batch_duration_seconds` (histogram): batch latency by error flag
//! - `fanout_admission_in_flight` (gauge): tickets currently held
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels kept low-cardinality (no URLs)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one inbound HTTP request.
pub fn record_request(status: u16, start_time: Instant) {
    let status = status.to_string();
    metrics::counter!("fanout_http_requests_total", "status" => status).increment(1);
    metrics::histogram!("fanout_http_request_duration_seconds")
        .record(start_time.elapsed().as_secs_f64());
}

/// Record one batch outcome. `kind` is `"ok"` on success.
pub fn record_batch(error: bool, kind: &'static str, start_time: Instant) {
    let error = if error { "true" } else { "false" };
    metrics::counter!("fanout_batches_total", "error" => error, "kind" => kind).increment(1);
    metrics::histogram!("fanout_batch_duration_seconds", "error" => error)
        .record(start_time.elapsed().as_secs_f64());
}

/// Track how many admission tickets are held.
pub fn record_admission_in_flight(in_flight: usize) {
    metrics::gauge!("fanout_admission_in_flight").set(in_flight as f64);
}
