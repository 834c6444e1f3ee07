//! Job status and cancellation endpoints.

use super::{ApiError, AppState};
use crate::orchestrator::SubmitRequest;
use crate::queue::{CancelOutcome, Job};
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// GET /v1/jobs/:id
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job<SubmitRequest>>, ApiError> {
    Ok(Json(state.orchestrator.job_status(id)?))
}

/// DELETE /v1/jobs/:id
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelOutcome>, ApiError> {
    let outcome = state.orchestrator.cancel_job(id)?;
    tracing::info!(job_id = %id, outcome = ?outcome, "Job cancel requested via API");
    Ok(Json(outcome))
}
