//! Metrics collection and exposition.
//!
//! # Metrics
//! - `twemproxy_sync_updates_total` (counter): updates by outcome
//! - `twemproxy_sync_compile_errors_total` (counter): apps dropped from a compile
//! - `twemproxy_sync_proxy_actions_total` (counter): starts, reloads, restarts
//! - `twemproxy_sync_process_exits_total` (counter): proxy exits by result
//! - `twemproxy_sync_pools` (gauge): pools in the last applied config

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_update(outcome: &'static str) {
    metrics::counter!("twemproxy_sync_updates_total", "outcome" => outcome).increment(1);
}

pub fn record_compile_errors(count: usize) {
    if count > 0 {
        metrics::counter!("twemproxy_sync_compile_errors_total").increment(count as u64);
    }
}

pub fn record_proxy_action(action: &'static str) {
    metrics::counter!("twemproxy_sync_proxy_actions_total", "action" => action).increment(1);
}

pub fn record_process_exit(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("twemproxy_sync_process_exits_total", "result" => result).increment(1);
}

pub fn record_applied_pools(count: usize) {
    metrics::gauge!("twemproxy_sync_pools").set(count as f64);
}
