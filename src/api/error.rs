//! API error envelope and status mapping.

use crate::confirmation::ConfirmationError;
use crate::engine::EngineError;
use crate::orchestrator::OrchestratorError;
use crate::queue::QueueError;
use crate::registry::RegistryError;
use crate::routing::RoutingError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    pub code: String,
}

impl ApiError {
    fn new(message: impl Into<String>, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                code: code.to_string(),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "invalid_request_error", "invalid_request")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_str() {
            "invalid_request" => StatusCode::BAD_REQUEST,
            "confirmation_denied" | "confirmation_expired" => StatusCode::FORBIDDEN,
            "job_not_found" | "confirmation_not_found" | "backend_not_found" => {
                StatusCode::NOT_FOUND
            }
            "backend_exists" => StatusCode::CONFLICT,
            "queue_full" => StatusCode::TOO_MANY_REQUESTS,
            "all_backends_unavailable" => StatusCode::BAD_GATEWAY,
            "no_candidate" | "circuit_open" | "queue_disabled" => StatusCode::SERVICE_UNAVAILABLE,
            "deadline_exceeded" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let message = err.to_string();
        let (r#type, code) = match &err {
            OrchestratorError::Routing(RoutingError::NoCandidate { .. }) => {
                ("routing_error", "no_candidate")
            }
            OrchestratorError::Engine(EngineError::CircuitOpen { .. }) => {
                ("execution_error", "circuit_open")
            }
            OrchestratorError::Engine(EngineError::AllBackendsUnavailable { .. }) => {
                ("execution_error", "all_backends_unavailable")
            }
            OrchestratorError::Engine(EngineError::DeadlineExceeded { .. }) => {
                ("execution_error", "deadline_exceeded")
            }
            OrchestratorError::Confirmation(ConfirmationError::Denied { .. }) => {
                ("confirmation_error", "confirmation_denied")
            }
            OrchestratorError::Confirmation(ConfirmationError::Timeout { .. }) => {
                ("confirmation_error", "confirmation_expired")
            }
            OrchestratorError::Confirmation(ConfirmationError::NotFound(_)) => {
                ("invalid_request_error", "confirmation_not_found")
            }
            OrchestratorError::Queue(QueueError::Full { .. }) => ("queue_error", "queue_full"),
            OrchestratorError::Queue(QueueError::Disabled) => ("queue_error", "queue_disabled"),
            OrchestratorError::Queue(QueueError::NotFound(_)) => {
                ("invalid_request_error", "job_not_found")
            }
            OrchestratorError::Queue(QueueError::RetriesExhausted { .. }) => {
                ("queue_error", "retries_exhausted")
            }
            OrchestratorError::Queue(QueueError::Interrupted) => ("queue_error", "job_interrupted"),
            OrchestratorError::Registry(RegistryError::DescriptorNotFound(_)) => {
                ("invalid_request_error", "backend_not_found")
            }
            OrchestratorError::Registry(RegistryError::DuplicateDescriptor(_)) => {
                ("invalid_request_error", "backend_exists")
            }
            OrchestratorError::Agent(_) | OrchestratorError::Config(_) => {
                ("server_error", "internal_error")
            }
        };
        Self::new(message, r#type, code)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = %self.error.code, message = %self.error.message, "Request failed");
        }
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TaskTier;
    use crate::routing::Requirements;
    use uuid::Uuid;

    fn status_of(err: impl Into<OrchestratorError>) -> StatusCode {
        ApiError::from(err.into()).status_code()
    }

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(
            status_of(RoutingError::NoCandidate {
                tier: TaskTier::Expert,
                requirements: Requirements::default(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(EngineError::AllBackendsUnavailable { failures: vec![] }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(EngineError::DeadlineExceeded { failures: vec![] }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(ConfirmationError::Timeout {
                operation_id: "deploy.x".to_string()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(QueueError::Full { max_size: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(QueueError::NotFound(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RegistryError::DescriptorNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn envelope_serialization() {
        let err = ApiError::from(OrchestratorError::from(ConfirmationError::Denied {
            operation_id: "db.drop_users".to_string(),
            reason: "no".to_string(),
        }));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"]["code"], "confirmation_denied");
        assert_eq!(json["error"]["type"], "confirmation_error");
        assert_eq!(
            json["error"]["message"],
            "Operation 'db.drop_users' denied: no"
        );
    }
}
