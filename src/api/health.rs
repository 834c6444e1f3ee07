//! Health check endpoint handler.

use crate::api::AppState;
use crate::breaker::{CircuitSnapshot, CircuitState};
use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when every circuit is closed, `unhealthy` when none is
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub backends: BTreeMap<String, CircuitSnapshot>,
}

fn overall_status(backends: &BTreeMap<String, CircuitSnapshot>) -> &'static str {
    let closed = backends
        .values()
        .filter(|s| s.state == CircuitState::Closed)
        .count();
    match (closed, backends.len()) {
        (c, t) if c == t && t > 0 => "healthy",
        (c, _) if c > 0 => "degraded",
        _ => "unhealthy",
    }
}

/// GET /health - Per-backend circuit snapshot.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = state.orchestrator.health();
    Json(HealthResponse {
        status: overall_status(&backends),
        uptime_seconds: state.metrics.uptime_seconds(),
        backends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(id: &str, state: CircuitState) -> (String, CircuitSnapshot) {
        (
            id.to_string(),
            CircuitSnapshot {
                backend_id: id.to_string(),
                state,
                consecutive_failures: 0,
                last_transition: Utc::now(),
                probe_in_flight: false,
                cooldown_remaining_ms: None,
            },
        )
    }

    #[test]
    fn test_overall_status() {
        let empty = BTreeMap::new();
        assert_eq!(overall_status(&empty), "unhealthy");

        let all_closed: BTreeMap<_, _> = [snapshot("a", CircuitState::Closed)].into();
        assert_eq!(overall_status(&all_closed), "healthy");

        let mixed: BTreeMap<_, _> = [
            snapshot("a", CircuitState::Closed),
            snapshot("b", CircuitState::Open),
        ]
        .into();
        assert_eq!(overall_status(&mixed), "degraded");

        let none_closed: BTreeMap<_, _> = [snapshot("a", CircuitState::HalfOpen)].into();
        assert_eq!(overall_status(&none_closed), "unhealthy");
    }
}
