//! Metrics collection and exposition.
//!
//! # Metrics
//! - `custody_submissions_total` (counter): submissions by intent and outcome
//! - `custody_receipt_wait_seconds` (histogram): time from broadcast to receipt
//! - `custody_ledger_transitions_total` (counter): accepted local transitions by op
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub fn record_submission(intent: &'static str, outcome: &'static str) {
    counter!("custody_submissions_total", "intent" => intent, "outcome" => outcome).increment(1);
}

pub fn record_receipt_wait(intent: &'static str, seconds: f64) {
    histogram!("custody_receipt_wait_seconds", "intent" => intent).record(seconds);
}

pub fn record_ledger_transition(op: &'static str) {
    counter!("custody_ledger_transitions_total", "op" => op).increment(1);
}

/// Install the Prometheus recorder with a scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
