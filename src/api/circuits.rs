//! Operator circuit control.

use super::{ApiError, AppState};
use crate::breaker::CircuitSnapshot;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

/// POST /v1/circuits/:id/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CircuitSnapshot>, ApiError> {
    let snapshot = state.orchestrator.reset_circuit(&id)?;
    tracing::info!(backend_id = %id, "Circuit reset via API");
    Ok(Json(snapshot))
}
