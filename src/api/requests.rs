//! Request submission endpoint.

use super::{ApiError, AppState};
use crate::orchestrator::{SubmitRequest, Submission};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

/// POST /v1/requests - 200 with the result, or 202 with a job handle.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;

    match state.orchestrator.submit(request).await? {
        Submission::Completed(result) => Ok((StatusCode::OK, Json(result)).into_response()),
        Submission::Queued(handle) => Ok((StatusCode::ACCEPTED, Json(handle)).into_response()),
    }
}
