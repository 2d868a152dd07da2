//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): gate decisions by outcome
//! - `gate_audit_dropped_total` (counter): records lost to a full audit channel
//! - `gate_audit_write_failures_total` (counter): failed audit file writes
//! - `gate_credential_rotations_total` (counter): credential rotations
//! - `gate_rate_limit_buckets` (gauge): origins currently tracked
//!
//! The exporter should stay on a loopback address: decision counters are
//! exactly the signal the gate hides from callers.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::audit::Decision;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(decision: Decision) {
    ::metrics::counter!("gate_decisions_total", "decision" => decision.as_str()).increment(1);
}

pub fn record_audit_dropped() {
    ::metrics::counter!("gate_audit_dropped_total").increment(1);
}

pub fn record_audit_write_failure() {
    ::metrics::counter!("gate_audit_write_failures_total").increment(1);
}

pub fn record_rotation() {
    ::metrics::counter!("gate_credential_rotations_total").increment(1);
}

pub fn record_rate_limit_buckets(count: usize) {
    ::metrics::gauge!("gate_rate_limit_buckets").set(count as f64);
}
