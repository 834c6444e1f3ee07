//! Per-backend circuit breakers.
//!
//! One [`BreakerState`] per backend id, created on first reference and kept
//! for the life of the process. Each breaker sits behind its own mutex inside
//! a concurrent map, so transitions on one backend never block another.
//! Mutexes are never held across an `.await`.
//!
//! Every transition is pushed to the registry through [`HealthSink`]:
//! entering Open marks the backend unhealthy; entering HalfOpen or Closed
//! marks it healthy again so the router can pick it.

mod config;
mod state;

#[cfg(test)]
mod tests;

pub use config::*;
pub use state::*;

use crate::registry::HealthSink;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Error returned when a breaker refuses a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit for backend '{backend_id}' is {state}")]
pub struct CircuitOpenError {
    pub backend_id: String,
    pub state: CircuitState,
}

/// All breakers, keyed by backend id.
pub struct CircuitBreakers {
    breakers: DashMap<String, Arc<Mutex<BreakerState>>>,
    config: BreakerConfig,
    health: Arc<dyn HealthSink>,
}

fn lock(breaker: &Mutex<BreakerState>) -> MutexGuard<'_, BreakerState> {
    // State stays consistent across a panic: every mutation is a single step.
    breaker.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CircuitBreakers {
    pub fn new(config: BreakerConfig, health: Arc<dyn HealthSink>) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
            health,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn breaker(&self, id: &str) -> Arc<Mutex<BreakerState>> {
        if let Some(existing) = self.breakers.get(id) {
            return Arc::clone(existing.value());
        }
        let entry = self.breakers.entry(id.to_string()).or_default();
        Arc::clone(entry.value())
    }

    /// Ask permission to call a backend.
    ///
    /// The returned permit must be settled with [`CallPermit::success`] or
    /// [`CallPermit::failure`]; dropping it unsettled releases a half-open
    /// probe slot without a transition.
    pub fn try_acquire(&self, id: &str) -> Result<CallPermit<'_>, CircuitOpenError> {
        let breaker = self.breaker(id);
        let (admission, transition, state) = {
            let mut guard = lock(&breaker);
            let (admission, transition) = guard.admit(Instant::now(), self.config.cooldown());
            (admission, transition, guard.state())
        };

        if let Some(transition) = transition {
            self.report(id, transition, None);
        }

        match admission {
            Admission::Admitted { probe } => {
                if probe {
                    tracing::debug!(backend_id = %id, "Admitting half-open probe");
                }
                Ok(CallPermit {
                    breakers: self,
                    breaker,
                    backend_id: id.to_string(),
                    probe,
                    settled: false,
                })
            }
            Admission::Rejected => Err(CircuitOpenError {
                backend_id: id.to_string(),
                state,
            }),
        }
    }

    /// Whether a call to this backend would be rejected right now.
    ///
    /// Side-effect free: does not promote or claim a probe slot.
    #[cfg(test)]
    pub(crate) fn is_rejecting(&self, id: &str) -> bool {
        match self.breakers.get(id) {
            Some(breaker) => {
                lock(breaker.value()).would_reject(Instant::now(), self.config.cooldown())
            }
            None => false,
        }
    }

    /// Move every open breaker past its cooldown to half-open.
    ///
    /// Returns the ids that changed.
    pub fn promote_cooled_down(&self) -> Vec<String> {
        let now = Instant::now();
        let cooldown = self.config.cooldown();

        // Collect first; the map shard must not be held while reporting.
        let all: Vec<(String, Arc<Mutex<BreakerState>>)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut promoted = Vec::new();
        for (id, breaker) in all {
            let transition = lock(&breaker).promote_if_cooled(now, cooldown);
            if let Some(transition) = transition {
                self.report(&id, transition, None);
                promoted.push(id);
            }
        }
        promoted
    }

    /// Snapshot of one backend's breaker. Unknown ids read as a fresh Closed breaker.
    pub fn snapshot(&self, id: &str) -> CircuitSnapshot {
        let breaker = self.breaker(id);
        let guard = lock(&breaker);
        guard.snapshot(id, Instant::now(), self.config.cooldown())
    }

    /// Snapshots for every breaker created so far, ordered by id.
    pub fn snapshots(&self) -> BTreeMap<String, CircuitSnapshot> {
        let now = Instant::now();
        let cooldown = self.config.cooldown();
        let all: Vec<(String, Arc<Mutex<BreakerState>>)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        all.into_iter()
            .map(|(id, breaker)| {
                let snapshot = lock(&breaker).snapshot(&id, now, cooldown);
                (id, snapshot)
            })
            .collect()
    }

    /// Operator reset to Closed.
    pub fn reset(&self, id: &str) -> CircuitSnapshot {
        let breaker = self.breaker(id);
        let transition = lock(&breaker).reset(Instant::now());
        if let Some(transition) = transition {
            tracing::info!(backend_id = %id, from = %transition.from, "Circuit manually reset");
            self.report(id, transition, None);
        }
        self.snapshot(id)
    }

    fn record_success(&self, id: &str, breaker: &Mutex<BreakerState>, probe: bool) {
        let transition = lock(breaker).on_success(probe, Instant::now());
        if let Some(transition) = transition {
            self.report(id, transition, None);
        }
        if let Err(e) = self.health.record_success(id) {
            tracing::warn!(backend_id = %id, error = %e, "Failed to record success");
        }
    }

    fn record_failure(&self, id: &str, breaker: &Mutex<BreakerState>, probe: bool, reason: &str) {
        let (transition, failures) = {
            let mut guard = lock(breaker);
            let transition =
                guard.on_failure(probe, self.config.failure_threshold, Instant::now());
            (transition, guard.consecutive_failures())
        };
        tracing::debug!(backend_id = %id, consecutive_failures = failures, probe, "Backend call failed");
        if let Some(transition) = transition {
            self.report(id, transition, Some(reason.to_string()));
        }
    }

    fn release_probe(&self, id: &str, breaker: &Mutex<BreakerState>) {
        lock(breaker).release_probe();
        tracing::debug!(backend_id = %id, "Half-open probe abandoned without outcome");
    }

    fn report(&self, id: &str, transition: Transition, reason: Option<String>) {
        tracing::info!(
            backend_id = %id,
            from = %transition.from,
            to = %transition.to,
            reason = reason.as_deref().unwrap_or(""),
            "Circuit state transition"
        );

        metrics::counter!(
            "gatekeeper_circuit_transitions_total",
            "backend" => id.to_string(),
            "to" => transition.to.to_string()
        )
        .increment(1);
        metrics::gauge!("gatekeeper_circuit_state", "backend" => id.to_string())
            .set(transition.to.as_gauge());

        let result = match transition.to {
            CircuitState::Open => self.health.mark_unhealthy(id, reason),
            CircuitState::HalfOpen | CircuitState::Closed => self.health.mark_healthy(id),
        };
        if let Err(e) = result {
            tracing::warn!(backend_id = %id, error = %e, "Failed to update registry health");
        }
    }
}

/// Permission to make one call through a breaker.
pub struct CallPermit<'a> {
    breakers: &'a CircuitBreakers,
    breaker: Arc<Mutex<BreakerState>>,
    backend_id: String,
    probe: bool,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breakers
            .record_success(&self.backend_id, &self.breaker, self.probe);
    }

    pub fn failure(mut self, reason: &str) {
        self.settled = true;
        self.breakers
            .record_failure(&self.backend_id, &self.breaker, self.probe, reason);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breakers.release_probe(&self.backend_id, &self.breaker);
        }
    }
}
