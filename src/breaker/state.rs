//! Per-backend circuit state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Circuit state for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are rejected until the cooldown elapses
    Open,
    /// A single probe call decides between Closed and Open
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding for the state gauge
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of a breaker, safe to hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub backend_id: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_transition: DateTime<Utc>,
    pub probe_in_flight: bool,
    /// Time left before an open circuit admits a probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_ms: Option<u64>,
}

/// A state change produced by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Call may proceed; `probe` is set for the single half-open trial
    Admitted { probe: bool },
    /// Circuit is open, or a probe is already in flight
    Rejected,
}

/// Mutable breaker state. Always accessed under its own mutex.
#[derive(Debug)]
pub struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_transition: DateTime<Utc>,
    probe_in_flight: bool,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_transition: Utc::now(),
            probe_in_flight: false,
        }
    }
}

impl BreakerState {
    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn transition(&mut self, to: CircuitState, now: Instant) -> Transition {
        let from = self.state;
        self.state = to;
        self.last_transition = Utc::now();
        match to {
            CircuitState::Open => {
                self.opened_at = Some(now);
                self.probe_in_flight = false;
            }
            CircuitState::HalfOpen => {
                self.probe_in_flight = false;
            }
            CircuitState::Closed => {
                self.opened_at = None;
                self.consecutive_failures = 0;
                self.probe_in_flight = false;
            }
        }
        Transition { from, to }
    }

    fn cooled_down(&self, now: Instant, cooldown: Duration) -> bool {
        self.opened_at
            .map(|opened| now.saturating_duration_since(opened) >= cooldown)
            .unwrap_or(true)
    }

    /// Move Open to HalfOpen if the cooldown has elapsed.
    pub fn promote_if_cooled(&mut self, now: Instant, cooldown: Duration) -> Option<Transition> {
        if self.state == CircuitState::Open && self.cooled_down(now, cooldown) {
            return Some(self.transition(CircuitState::HalfOpen, now));
        }
        None
    }

    /// Decide whether a call may proceed.
    ///
    /// May promote an open circuit to half-open first; the returned
    /// transition must be reported by the caller.
    pub fn admit(&mut self, now: Instant, cooldown: Duration) -> (Admission, Option<Transition>) {
        let promoted = self.promote_if_cooled(now, cooldown);
        let admission = match self.state {
            CircuitState::Closed => Admission::Admitted { probe: false },
            CircuitState::Open => Admission::Rejected,
            CircuitState::HalfOpen if self.probe_in_flight => Admission::Rejected,
            CircuitState::HalfOpen => {
                self.probe_in_flight = true;
                Admission::Admitted { probe: true }
            }
        };
        (admission, promoted)
    }

    /// Whether `admit` would currently reject, without side effects.
    pub fn would_reject(&self, now: Instant, cooldown: Duration) -> bool {
        match self.state {
            CircuitState::Closed => false,
            CircuitState::Open => !self.cooled_down(now, cooldown),
            CircuitState::HalfOpen => self.probe_in_flight,
        }
    }

    pub fn on_success(&mut self, probe: bool, now: Instant) -> Option<Transition> {
        match self.state {
            CircuitState::HalfOpen if probe => Some(self.transition(CircuitState::Closed, now)),
            CircuitState::Closed => {
                self.consecutive_failures = 0;
                None
            }
            // Stale result from a call admitted before the circuit opened
            _ => None,
        }
    }

    pub fn on_failure(&mut self, probe: bool, threshold: u32, now: Instant) -> Option<Transition> {
        match self.state {
            CircuitState::HalfOpen if probe => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                Some(self.transition(CircuitState::Open, now))
            }
            CircuitState::Closed => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= threshold {
                    Some(self.transition(CircuitState::Open, now))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Free the probe slot of a probe abandoned without outcome.
    pub fn release_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.probe_in_flight = false;
        }
    }

    /// Operator reset: back to Closed with a clean counter.
    pub fn reset(&mut self, now: Instant) -> Option<Transition> {
        if self.state == CircuitState::Closed {
            self.consecutive_failures = 0;
            return None;
        }
        Some(self.transition(CircuitState::Closed, now))
    }

    pub fn snapshot(&self, backend_id: &str, now: Instant, cooldown: Duration) -> CircuitSnapshot {
        let cooldown_remaining_ms = match (self.state, self.opened_at) {
            (CircuitState::Open, Some(opened)) => {
                Some(cooldown.saturating_sub(now.saturating_duration_since(opened)).as_millis() as u64)
            }
            _ => None,
        };
        CircuitSnapshot {
            backend_id: backend_id.to_string(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            last_transition: self.last_transition,
            probe_in_flight: self.probe_in_flight,
            cooldown_remaining_ms,
        }
    }
}
