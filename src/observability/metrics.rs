//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_phase` (gauge): 0=running, 1=shutting down, 2=cleaning up, 3=done
//! - `lifecycle_phase_duration_seconds` (histogram): time spent per phase
//! - `lifecycle_cleanup_failures_total` (counter): failed cleanup actions by name
//! - `lifecycle_in_flight_requests` (gauge): requests being handled right now

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_phase(phase: &'static str, ordinal: u8) {
    metrics::gauge!("lifecycle_phase").set(f64::from(ordinal));
    metrics::counter!("lifecycle_phase_transitions_total", "phase" => phase).increment(1);
}

pub fn record_phase_duration(phase: &'static str, elapsed: Duration) {
    metrics::histogram!("lifecycle_phase_duration_seconds", "phase" => phase)
        .record(elapsed.as_secs_f64());
}

pub fn record_cleanup_failure(action: &str) {
    metrics::counter!("lifecycle_cleanup_failures_total", "action" => action.to_string())
        .increment(1);
}

pub fn record_in_flight(count: u64) {
    metrics::gauge!("lifecycle_in_flight_requests").set(count as f64);
}
