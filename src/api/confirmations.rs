//! Confirmation listing and resolution endpoints.

use super::{ApiError, AppState};
use crate::confirmation::{ConfirmationError, ConfirmationRequest, ConfirmationStatus};
use crate::orchestrator::OrchestratorError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Optional body for a denial
#[derive(Debug, Default, Deserialize)]
pub struct DenyBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Status of a confirmation after an approve or deny call.
///
/// `status` is the settled status, which differs from the requested action
/// when the request had already been resolved.
#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub id: Uuid,
    pub status: ConfirmationStatus,
}

/// GET /v1/confirmations
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<ConfirmationRequest>> {
    Json(state.orchestrator.pending_confirmations())
}

/// GET /v1/confirmations/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmationRequest>, ApiError> {
    state
        .orchestrator
        .confirmation(id)
        .map(Json)
        .ok_or_else(|| OrchestratorError::from(ConfirmationError::NotFound(id)).into())
}

/// POST /v1/confirmations/:id/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    let status = state.orchestrator.approve(id)?;
    Ok(Json(ResolutionResponse { id, status }))
}

/// POST /v1/confirmations/:id/deny
pub async fn deny(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<DenyBody>>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    let reason = body.and_then(|Json(body)| body.reason);
    let status = state.orchestrator.deny(id, reason)?;
    Ok(Json(ResolutionResponse { id, status }))
}
