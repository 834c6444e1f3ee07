//! # Control API
//!
//! HTTP endpoints over the orchestrator.
//!
//! ## Endpoints
//!
//! - `POST /v1/requests` - Submit a request (200 with result, 202 with job handle)
//! - `GET /v1/jobs/:id` - Job status
//! - `DELETE /v1/jobs/:id` - Cancel a job
//! - `GET /v1/confirmations` - Pending confirmations, oldest first
//! - `GET /v1/confirmations/:id` - One confirmation request
//! - `POST /v1/confirmations/:id/approve` - Approve
//! - `POST /v1/confirmations/:id/deny` - Deny, with optional `{"reason": "..."}`
//! - `POST /v1/circuits/:id/reset` - Force a circuit closed
//! - `GET /health` - Per-backend circuit snapshot
//! - `GET /metrics` - Prometheus exposition (when enabled)
//! - `GET /v1/stats` - JSON stats
//!
//! ## Error Handling
//!
//! Every error uses the same envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Operation 'deploy.production' denied: not today",
//!     "type": "confirmation_error",
//!     "code": "confirmation_denied"
//!   }
//! }
//! ```

mod circuits;
mod confirmations;
mod error;
mod health;
mod jobs;
mod requests;

pub use error::{ApiError, ApiErrorBody};
pub use health::HealthResponse;

use crate::metrics::MetricsCollector;
use crate::orchestrator::Orchestrator;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Default maximum request body size (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub metrics: Arc<MetricsCollector>,
    pub body_limit: usize,
}

impl AppState {
    /// State without Prometheus export.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let metrics = Arc::new(MetricsCollector::new(
            Arc::clone(&orchestrator),
            Instant::now(),
            None,
        ));
        Self {
            orchestrator,
            metrics,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Create the API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/v1/requests", post(requests::submit))
        .route(
            "/v1/jobs/:id",
            get(jobs::status).delete(jobs::cancel),
        )
        .route("/v1/confirmations", get(confirmations::list))
        .route("/v1/confirmations/:id", get(confirmations::show))
        .route("/v1/confirmations/:id/approve", post(confirmations::approve))
        .route("/v1/confirmations/:id/deny", post(confirmations::deny))
        .route("/v1/circuits/:id/reset", post(circuits::reset))
        .route("/health", get(health::handle))
        .route("/v1/stats", get(crate::metrics::handler::stats_handler));

    if state.metrics.is_exporting() {
        router = router.route("/metrics", get(crate::metrics::handler::metrics_handler));
    }

    router
        .layer(RequestBodyLimitLayer::new(state.body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
