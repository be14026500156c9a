//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, backend
//! - `gateway_request_duration_seconds` (histogram): time to response head
//! - `gateway_auth_failures_total` (counter): rejections by reason
//! - `gateway_upstream_errors_total` (counter): forwarding failures by kind
//! - `gateway_streams_total` (counter): relayed bodies by outcome
//! - `gateway_stream_bytes_total` (counter): response bytes relayed
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("gateway_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_upstream_error(kind: &'static str, backend: &str) {
    metrics::counter!(
        "gateway_upstream_errors_total",
        "kind" => kind,
        "backend" => backend.to_string()
    )
    .increment(1);
}

pub fn record_stream(backend: &str, outcome: &'static str, bytes: u64) {
    metrics::counter!(
        "gateway_streams_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    metrics::counter!("gateway_stream_bytes_total", "backend" => backend.to_string())
        .increment(bytes);
}
