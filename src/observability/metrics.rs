//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_dispatch_total` (counter): dispatches by module, operation, status
//! - `bridge_dispatch_duration_seconds` (histogram): dispatch latency by module
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every update is a no-op
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`
//! - Labels come from closed sets: a parsed module and an operation a handler
//!   accepted. Anything else is recorded as `"-"`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::bindings::Module;

/// Label for a module that did not parse.
pub const UNKNOWN_MODULE: &str = "-";
/// Label for an operation no handler accepted.
pub const UNKNOWN_OPERATION: &str = "-";

/// Record one completed dispatch. `operation` is `None` unless a handler
/// recognized it.
pub fn record_dispatch(module: Option<Module>, operation: Option<&str>, status: u16, start: Instant) {
    let module = module.map_or(UNKNOWN_MODULE, |m| m.as_str());
    metrics::counter!(
        "bridge_dispatch_total",
        "module" => module,
        "operation" => operation.unwrap_or(UNKNOWN_OPERATION).to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "bridge_dispatch_duration_seconds",
        "module" => module
    )
    .record(start.elapsed().as_secs_f64());
}

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
