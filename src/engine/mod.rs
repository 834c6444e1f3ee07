//! Circuit-breaker execution engine.
//!
//! Walks a routing decision's candidates in order. Candidates whose breaker
//! refuses the call are skipped without being invoked. Every invocation is
//! bounded by the shorter of the remaining caller deadline and the engine's
//! per-call timeout; a failure or engine timeout counts against that
//! backend's breaker and the engine advances to the next candidate.
//!
//! When the caller's deadline is the binding limit and it elapses, the call
//! is abandoned without penalty to the backend and the engine stops with
//! [`EngineError::DeadlineExceeded`].

mod error;

pub use error::{AttemptFailure, EngineError, FailureReason};

use crate::agent::{AgentError, AgentResponse, Payload};
use crate::breaker::{BreakerConfig, CircuitBreakers, CircuitSnapshot};
use crate::registry::{DescriptorFilter, Registry, RegistryError};
use crate::routing::RoutingDecision;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Successful execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    /// Backend that produced the response
    pub backend_id: String,
    pub response: AgentResponse,
    /// Candidates tried or skipped before the successful one, in order
    pub failures: Vec<AttemptFailure>,
    pub elapsed_ms: u64,
}

enum Attempt {
    Succeeded(AgentResponse),
    Failed(FailureReason),
    /// Caller deadline elapsed mid-call; nothing was recorded
    Abandoned,
}

/// Executes requests against ranked candidates with one breaker per backend.
pub struct ExecutionEngine {
    registry: Arc<Registry>,
    breakers: CircuitBreakers,
    call_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<Registry>, config: BreakerConfig) -> Self {
        let call_timeout = config.call_timeout();
        let breakers = CircuitBreakers::new(config, registry.clone());
        Self {
            registry,
            breakers,
            call_timeout,
        }
    }

    /// Override the per-call timeout.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Advance open breakers whose cooldown elapsed so they can be routed a probe.
    pub fn promote_cooled_down(&self) -> Vec<String> {
        self.breakers.promote_cooled_down()
    }

    /// Circuit snapshot for every registered backend, ordered by id.
    pub fn health(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.promote_cooled_down();
        self.registry
            .list(&DescriptorFilter::all())
            .into_iter()
            .map(|descriptor| {
                let snapshot = self.breakers.snapshot(&descriptor.id);
                (descriptor.id, snapshot)
            })
            .collect()
    }

    /// Operator reset of one backend's circuit.
    pub fn reset(&self, id: &str) -> Result<CircuitSnapshot, RegistryError> {
        if self.registry.get(id).is_none() {
            return Err(RegistryError::DescriptorNotFound(id.to_string()));
        }
        Ok(self.breakers.reset(id))
    }

    /// Execute a payload against the decision's candidates in order.
    pub async fn execute(
        &self,
        decision: &RoutingDecision,
        payload: &Payload,
        deadline: Duration,
    ) -> Result<ExecutionOutcome, EngineError> {
        let started = Instant::now();
        let expires = started.checked_add(deadline);
        let mut failures = Vec::new();

        for backend_id in decision.candidate_ids() {
            let remaining = match expires {
                Some(expires) => expires.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                tracing::warn!(
                    request_id = %payload.request_id,
                    attempts = failures.len(),
                    "Caller deadline exhausted before next candidate"
                );
                return Err(EngineError::DeadlineExceeded { failures });
            }

            match self.attempt(backend_id, payload, remaining).await {
                Attempt::Succeeded(response) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    tracing::info!(
                        request_id = %payload.request_id,
                        backend_id = %backend_id,
                        skipped_or_failed = failures.len(),
                        elapsed_ms,
                        "Request executed"
                    );
                    return Ok(ExecutionOutcome {
                        backend_id: backend_id.to_string(),
                        response,
                        failures,
                        elapsed_ms,
                    });
                }
                Attempt::Failed(reason) => {
                    failures.push(AttemptFailure {
                        backend_id: backend_id.to_string(),
                        reason,
                    });
                }
                Attempt::Abandoned => {
                    tracing::warn!(
                        request_id = %payload.request_id,
                        backend_id = %backend_id,
                        "Caller deadline elapsed during backend call"
                    );
                    return Err(EngineError::DeadlineExceeded { failures });
                }
            }
        }

        tracing::warn!(
            request_id = %payload.request_id,
            attempts = failures.len(),
            "All candidates failed or were skipped"
        );
        Err(EngineError::AllBackendsUnavailable { failures })
    }

    /// Call one backend through its breaker, without failover.
    #[cfg(test)]
    pub(crate) async fn call_backend(
        &self,
        backend_id: &str,
        payload: &Payload,
        deadline: Duration,
    ) -> Result<AgentResponse, EngineError> {
        match self.attempt(backend_id, payload, deadline).await {
            Attempt::Succeeded(response) => Ok(response),
            Attempt::Failed(FailureReason::CircuitOpen { .. }) => Err(EngineError::CircuitOpen {
                backend_id: backend_id.to_string(),
            }),
            Attempt::Failed(reason) => Err(EngineError::AllBackendsUnavailable {
                failures: vec![AttemptFailure {
                    backend_id: backend_id.to_string(),
                    reason,
                }],
            }),
            Attempt::Abandoned => Err(EngineError::DeadlineExceeded {
                failures: Vec::new(),
            }),
        }
    }

    async fn attempt(&self, backend_id: &str, payload: &Payload, remaining: Duration) -> Attempt {
        let permit = match self.breakers.try_acquire(backend_id) {
            Ok(permit) => permit,
            Err(rejected) => {
                tracing::debug!(
                    request_id = %payload.request_id,
                    backend_id = %backend_id,
                    state = %rejected.state,
                    "Skipping candidate"
                );
                record_attempt(backend_id, "skipped");
                return Attempt::Failed(FailureReason::CircuitOpen {
                    state: rejected.state,
                });
            }
        };

        let Some(agent) = self.registry.get_agent(backend_id) else {
            tracing::error!(backend_id = %backend_id, "No agent registered for candidate");
            permit.failure("no agent registered");
            record_attempt(backend_id, "failure");
            return Attempt::Failed(FailureReason::MissingAgent);
        };

        let caller_bound = remaining < self.call_timeout;
        let budget = remaining.min(self.call_timeout);
        let started = Instant::now();

        tracing::debug!(
            request_id = %payload.request_id,
            backend_id = %backend_id,
            kind = agent.kind(),
            probe = permit.is_probe(),
            budget_ms = budget.as_millis() as u64,
            "Invoking backend"
        );

        let result = tokio::time::timeout(budget, agent.invoke(payload, budget)).await;
        metrics::histogram!(
            "gatekeeper_backend_call_duration_seconds",
            "backend" => backend_id.to_string()
        )
        .record(started.elapsed().as_secs_f64());

        let timed_out = match &result {
            Err(_) | Ok(Err(AgentError::Timeout(_))) => true,
            Ok(_) => false,
        };

        if timed_out && caller_bound {
            // Dropping the permit frees a probe slot without a transition.
            drop(permit);
            record_attempt(backend_id, "abandoned");
            return Attempt::Abandoned;
        }

        match result {
            Ok(Ok(response)) => {
                permit.success();
                record_attempt(backend_id, "success");
                Attempt::Succeeded(response)
            }
            Err(_) | Ok(Err(AgentError::Timeout(_))) => {
                let after_ms = budget.as_millis() as u64;
                tracing::warn!(
                    request_id = %payload.request_id,
                    backend_id = %backend_id,
                    after_ms,
                    "Backend call timed out"
                );
                permit.failure("timeout");
                record_attempt(backend_id, "timeout");
                Attempt::Failed(FailureReason::Timeout { after_ms })
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    request_id = %payload.request_id,
                    backend_id = %backend_id,
                    error = %e,
                    "Backend call failed"
                );
                let message = e.to_string();
                permit.failure(&message);
                record_attempt(backend_id, "failure");
                Attempt::Failed(FailureReason::Backend { message })
            }
        }
    }
}

fn record_attempt(backend_id: &str, outcome: &'static str) {
    metrics::counter!(
        "gatekeeper_backend_attempts_total",
        "backend" => backend_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
