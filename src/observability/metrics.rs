//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by alias, method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency by alias
//! - `proxy_upstream_errors_total` (counter): failed upstream exchanges by alias
//! - `proxy_body_rewrites_total` (counter): rewritten bodies by content rule
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter is opt-in (`observability.metrics_enabled`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(alias: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "alias" => alias.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "alias" => alias.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(alias: &str) {
    metrics::counter!("proxy_upstream_errors_total", "alias" => alias.to_string()).increment(1);
}

pub fn record_rewrite(rule: &str) {
    metrics::counter!("proxy_body_rewrites_total", "rule" => rule.to_string()).increment(1);
}
