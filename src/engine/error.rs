//! Execution engine error types

use crate::breaker::CircuitState;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why one candidate did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Skipped: the breaker refused the call, the backend was not invoked
    CircuitOpen { state: CircuitState },
    /// The backend call returned an error
    Backend { message: String },
    /// The engine's per-call timeout elapsed
    Timeout { after_ms: u64 },
    /// No agent is registered for the descriptor
    MissingAgent,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CircuitOpen { state } => write!(f, "circuit {}", state),
            FailureReason::Backend { message } => write!(f, "{}", message),
            FailureReason::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FailureReason::MissingAgent => write!(f, "no agent registered"),
        }
    }
}

/// One candidate that was tried or skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub backend_id: String,
    pub reason: FailureReason,
}

impl AttemptFailure {
    /// Skipped candidates were never invoked and did not count toward any breaker.
    pub fn was_skipped(&self) -> bool {
        matches!(self.reason, FailureReason::CircuitOpen { .. })
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend_id, self.reason)
    }
}

fn summarize(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A single backend refused the call. Only surfaced by direct calls;
    /// `execute` records it as a skipped candidate and moves on.
    #[error("Circuit open for backend '{backend_id}'")]
    CircuitOpen { backend_id: String },

    /// Every candidate failed or was skipped
    #[error("All backends unavailable: {}", summarize(.failures))]
    AllBackendsUnavailable { failures: Vec<AttemptFailure> },

    /// The caller's deadline elapsed before any candidate succeeded
    #[error("Deadline exceeded after {} attempt(s)", .failures.len())]
    DeadlineExceeded { failures: Vec<AttemptFailure> },
}

impl EngineError {
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            EngineError::CircuitOpen { .. } => &[],
            EngineError::AllBackendsUnavailable { failures }
            | EngineError::DeadlineExceeded { failures } => failures,
        }
    }
}
