//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dynconf_groups` (gauge): configuration groups registered
//! - `dynconf_refresh_total` (counter): watch-triggered re-reads by `result`
//! - `dynconf_initial_read_failures_total` (counter): groups created with an empty snapshot
//! - `dynconf_callback_panics_total` (counter): change callbacks that panicked

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_group_count(count: usize) {
    metrics::gauge!("dynconf_groups").set(count as f64);
}

pub fn record_refresh(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!("dynconf_refresh_total", "result" => result).increment(1);
}

pub fn record_initial_read_failure() {
    metrics::counter!("dynconf_initial_read_failures_total").increment(1);
}

pub fn record_callback_panic() {
    metrics::counter!("dynconf_callback_panics_total").increment(1);
}
