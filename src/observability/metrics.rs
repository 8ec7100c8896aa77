//! Metrics collection and exposition.
//!
//! # Metrics
//! - `correlator_registrations_total` (counter): request-hook outcomes by result
//! - `correlator_merges_total` (counter): merge task terminal outcomes
//! - `correlator_spans_total` (counter): span-end dispositions
//! - `correlator_live_tasks` (gauge): merge tasks in the live registry
//! - `correlator_merge_latency_seconds` (histogram): registration to terminal state
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exposition is optional and installed by the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_registration(result: &'static str) {
    metrics::counter!("correlator_registrations_total", "result" => result).increment(1);
}

pub fn record_merge(outcome: &'static str, latency: Duration) {
    metrics::counter!("correlator_merges_total", "outcome" => outcome).increment(1);
    metrics::histogram!("correlator_merge_latency_seconds").record(latency.as_secs_f64());
}

pub fn record_span_disposition(disposition: &'static str) {
    metrics::counter!("correlator_spans_total", "disposition" => disposition).increment(1);
}

pub fn record_live_tasks(count: usize) {
    metrics::gauge!("correlator_live_tasks").set(count as f64);
}
