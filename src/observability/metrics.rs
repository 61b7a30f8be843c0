//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatcher_connections_total` (counter): accepted connections by outcome
//!   (`dispatched`, `rejected`, `spawn_failed`)
//! - `dispatcher_accept_errors_total` (counter): transient accept failures
//! - `dispatcher_workers_reaped_total` (counter): workers collected by the reaper
//! - `dispatcher_workers_outstanding` (gauge): spawned but not yet reaped
//!
//! Recording is a no-op until a recorder is installed, so the dispatcher
//! records unconditionally and only the exporter is optional.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatched() {
    counter!("dispatcher_connections_total", "outcome" => "dispatched").increment(1);
}

pub fn record_rejected() {
    counter!("dispatcher_connections_total", "outcome" => "rejected").increment(1);
}

pub fn record_spawn_failed() {
    counter!("dispatcher_connections_total", "outcome" => "spawn_failed").increment(1);
}

pub fn record_accept_error() {
    counter!("dispatcher_accept_errors_total").increment(1);
}

pub fn record_reaped(count: usize) {
    if count > 0 {
        counter!("dispatcher_workers_reaped_total").increment(count as u64);
    }
}

pub fn set_outstanding_workers(count: usize) {
    gauge!("dispatcher_workers_outstanding").set(count as f64);
}
