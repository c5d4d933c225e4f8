//! Prometheus metrics for competition progress and API traffic.
//!
//! Exposed in Prometheus text format on a separate listener when
//! `--metrics-bind` / `METRICS_BIND` is set. Without an installed recorder
//! every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use dl_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/events/{event_id}/start", 200);
//! metrics::events_started_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Competition Metrics
// ============================================================================

pub fn events_started_total() {
    metrics::counter!("events_started_total").increment(1);
}

/// Brackets materialized at event start.
pub fn brackets_created_total(count: usize) {
    metrics::counter!("brackets_created_total").increment(count as u64);
}

pub fn heats_generated_total(count: usize) {
    metrics::counter!("heats_generated_total").increment(count as u64);
}

pub fn heats_finalized_total() {
    metrics::counter!("heats_finalized_total").increment(1);
}

pub fn brackets_completed_total() {
    metrics::counter!("brackets_completed_total").increment(1);
}

pub fn events_completed_total() {
    metrics::counter!("events_completed_total").increment(1);
}

/// Count a rejected competition call by error kind.
pub fn competition_errors_total(kind: &'static str) {
    metrics::counter!("competition_errors_total", "kind" => kind).increment(1);
}
