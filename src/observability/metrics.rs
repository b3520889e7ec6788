//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sandbox_requests_total` (counter): requests by method, status, route
//! - `sandbox_request_duration_seconds` (histogram): latency by route
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "none";

/// Serve Prometheus metrics on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "sandbox_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        "sandbox_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
