//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hostgate_requests_total` (counter): requests by decision and status
//! - `hostgate_request_duration_seconds` (histogram): time to response
//!   headers, by decision
//! - `hostgate_upstream_errors_total` (counter): failed upstream exchanges
//! - `hostgate_active_tunnels` (gauge): upgraded connections being relayed
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus
//! recorder, so tests and metrics-disabled deployments pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(decision: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "hostgate_requests_total",
        "decision" => decision,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("hostgate_request_duration_seconds", "decision" => decision)
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream exchange that failed before a response was sent.
pub fn record_upstream_error(upstream: &str) {
    metrics::counter!("hostgate_upstream_errors_total", "upstream" => upstream.to_string())
        .increment(1);
}

pub fn tunnel_opened() {
    metrics::gauge!("hostgate_active_tunnels").increment(1.0);
}

pub fn tunnel_closed() {
    metrics::gauge!("hostgate_active_tunnels").decrement(1.0);
}
