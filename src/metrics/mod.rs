//! # Metrics Collection Module
//!
//! Prometheus export and a JSON stats snapshot.
//!
//! ## Metrics Recorded
//!
//! **Counters:**
//! - `gatekeeper_circuit_transitions_total{backend, to}` - Breaker state changes
//! - `gatekeeper_backend_attempts_total{backend, outcome}` - Backend calls by outcome
//! - `gatekeeper_jobs_total{status}` - Jobs reaching a terminal status
//! - `gatekeeper_confirmations_total{resolution}` - Confirmations by resolution
//!
//! **Histograms:**
//! - `gatekeeper_backend_call_duration_seconds{backend}` - Backend call latency
//!
//! **Gauges:**
//! - `gatekeeper_backends_total` - Registered backends
//! - `gatekeeper_backends_healthy` - Backends the router may select
//! - `gatekeeper_circuit_state{backend}` - 0 closed, 1 half-open, 2 open
//! - `gatekeeper_queue_depth` - Pending jobs
//! - `gatekeeper_confirmations_pending` - Requests awaiting a decision

pub mod handler;
pub mod types;

pub use types::*;

use crate::orchestrator::Orchestrator;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

/// Latency buckets for backend calls, in seconds.
const CALL_DURATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
];

/// Computes derived gauges and renders the exposition text.
pub struct MetricsCollector {
    orchestrator: Arc<Orchestrator>,
    start_time: Instant,
    /// Absent when metrics export is disabled
    prometheus_handle: Option<PrometheusHandle>,
}

impl MetricsCollector {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        start_time: Instant,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            orchestrator,
            start_time,
            prometheus_handle,
        }
    }

    /// Refresh gauges derived from current registry and gate state.
    pub fn update_gauges(&self) {
        let registry = self.orchestrator.registry();
        metrics::gauge!("gatekeeper_backends_total").set(registry.descriptor_count() as f64);
        metrics::gauge!("gatekeeper_backends_healthy").set(registry.healthy_count() as f64);
        metrics::gauge!("gatekeeper_queue_depth").set(self.orchestrator.queue_depth() as f64);
        metrics::gauge!("gatekeeper_confirmations_pending")
            .set(self.orchestrator.pending_confirmations().len() as f64);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn is_exporting(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render Prometheus text format. Empty when export is disabled.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }

    /// Point-in-time stats for `GET /v1/stats`.
    pub fn stats(&self) -> StatsResponse {
        let registry = self.orchestrator.registry();
        let circuits = self.orchestrator.health();
        let open_circuits = circuits
            .values()
            .filter(|snapshot| snapshot.state != crate::breaker::CircuitState::Closed)
            .count();

        StatsResponse {
            uptime_seconds: self.uptime_seconds(),
            backends: BackendCounts {
                total: registry.descriptor_count(),
                healthy: registry.healthy_count(),
                circuits_not_closed: open_circuits,
            },
            queue_depth: self.orchestrator.queue_depth(),
            pending_confirmations: self.orchestrator.pending_confirmations().len(),
        }
    }
}

/// Install the global Prometheus recorder with latency buckets.
///
/// Fails if a recorder is already installed.
pub fn setup_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("gatekeeper_backend_call_duration_seconds".to_string()),
            CALL_DURATION_BUCKETS,
        )?
        .install_recorder()
}

/// Handle for the global recorder, or a detached one when a recorder is
/// already installed (tests building several servers).
pub fn prometheus_handle() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Metrics recorder already installed, using detached handle");
        PrometheusBuilder::new().build_recorder().handle()
    })
}
