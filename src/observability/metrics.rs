//! Metrics collection.
//!
//! # Metrics
//! - `engine_ordinal_writes_total` (counter): ordinal writes by phase
//! - `engine_temporary_relocations_total` (counter): vias parked on a temporary ordinal
//! - `engine_cascade_rows_total` (counter): rows removed or adjusted by the cascade, by kind
//! - `engine_membership_transitions_total` (counter): status changes by target status
//! - `engine_neighborhood_lookups_total` (counter): lookups by outcome
//! - `engine_operation_errors_total` (counter): failed operations by error kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus recorder renders on demand; no listener is opened

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            None
        }
    }
}

pub fn record_ordinal_writes(phase: &'static str, count: usize) {
    if count > 0 {
        ::metrics::counter!("engine_ordinal_writes_total", "phase" => phase).increment(count as u64);
    }
}

pub fn record_temporary_relocations(count: usize) {
    if count > 0 {
        ::metrics::counter!("engine_temporary_relocations_total").increment(count as u64);
    }
}

pub fn record_cascade_rows(kind: &'static str, count: usize) {
    if count > 0 {
        ::metrics::counter!("engine_cascade_rows_total", "kind" => kind).increment(count as u64);
    }
}

pub fn record_membership_transition(status: &'static str) {
    ::metrics::counter!("engine_membership_transitions_total", "status" => status).increment(1);
}

pub fn record_neighborhood_lookup(outcome: &'static str) {
    ::metrics::counter!("engine_neighborhood_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_operation_error(operation: &'static str, kind: &'static str) {
    ::metrics::counter!("engine_operation_errors_total", "operation" => operation, "kind" => kind)
        .increment(1);
}
