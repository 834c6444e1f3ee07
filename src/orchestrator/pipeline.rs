//! Classify, route, confirm, execute.

use super::{OrchestratorError, RequestResult, SubmitRequest};
use crate::agent::Payload;
use crate::classifier::classify;
use crate::confirmation::{
    ApprovalDecision, ApprovalRequest, ConfirmationError, ConfirmationGate, ConfirmationPolicy,
    EXPIRED_REASON,
};
use crate::engine::ExecutionEngine;
use crate::logging::truncate_text;
use crate::queue::{ClaimedJob, JobExecutor, JobFailure};
use crate::routing::{Requirements, Router};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Approval description used when the caller gave none
const DESCRIPTION_CHARS: usize = 200;

/// The request pipeline shared by immediate submissions and queue workers.
pub struct Pipeline {
    pub(super) router: Router,
    pub(super) engine: Arc<ExecutionEngine>,
    pub(super) gate: Arc<ConfirmationGate>,
    pub(super) policy: Arc<dyn ConfirmationPolicy>,
    pub(super) confirmation_timeout: Duration,
    /// Execution deadline for queued jobs without their own
    pub(super) job_deadline: Duration,
    /// Excerpt length for request text in debug logs, if enabled
    pub(super) content_preview: Option<usize>,
}

impl Pipeline {
    /// Run one request to completion.
    ///
    /// `deadline` bounds execution only; waiting for approval is bounded by
    /// the confirmation timeout.
    pub async fn run(
        &self,
        request_id: &str,
        request: &SubmitRequest,
        deadline: Duration,
    ) -> Result<RequestResult, OrchestratorError> {
        let classification = classify(&request.text);
        if let Some(chars) = self.content_preview {
            tracing::debug!(
                request_id,
                text = %truncate_text(&request.text, chars),
                "Request content"
            );
        }

        self.engine.promote_cooled_down();

        let strategy = request
            .strategy
            .unwrap_or_else(|| self.router.default_strategy());
        let requirements =
            Requirements::from_classification(&classification).with_tools(request.needs_tools);
        let decision = self
            .router
            .route_with(&classification, strategy, requirements)?;

        tracing::info!(
            request_id,
            tier = %classification.tier,
            is_code = classification.is_code,
            strategy = %decision.applied_strategy,
            primary = decision.primary().unwrap_or(""),
            "Request routed"
        );

        if let Some((operation_id, timeout)) = self.confirmation_wait(request) {
            self.confirm(request_id, operation_id, request, timeout).await?;
        }

        let mut payload = Payload::new(request_id, request.text.clone());
        payload.system = request.system.clone();
        let outcome = self.engine.execute(&decision, &payload, deadline).await?;

        Ok(RequestResult {
            request_id: request_id.to_string(),
            classification,
            task_type: classification.task_type(),
            strategy: decision.applied_strategy,
            candidates: decision.candidates,
            outcome,
        })
    }

    /// Gated operation id and how long its approval may take, if gated.
    fn confirmation_wait<'a>(&self, request: &'a SubmitRequest) -> Option<(&'a str, Duration)> {
        let operation_id = request.operation_id.as_deref()?;
        if !self.policy.requires_confirmation(operation_id) {
            return None;
        }
        let timeout = request
            .confirmation_timeout()
            .unwrap_or(self.confirmation_timeout);
        Some((operation_id, timeout))
    }

    /// Execution deadline for a queued job, capped by the job timeout.
    fn queued_deadline(&self, request: &SubmitRequest) -> Duration {
        request
            .deadline()
            .map_or(self.job_deadline, |d| d.min(self.job_deadline))
    }

    async fn confirm(
        &self,
        request_id: &str,
        operation_id: &str,
        request: &SubmitRequest,
        timeout: Duration,
    ) -> Result<(), ConfirmationError> {
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| truncate_text(&request.text, DESCRIPTION_CHARS));
        let approval = ApprovalRequest::new(operation_id, description)
            .with_context(request.context.clone())
            .with_parameters(request.parameters.clone());

        tracing::info!(request_id, operation_id, "Awaiting confirmation");
        match self.gate.request_approval(approval, timeout).await {
            ApprovalDecision::Approved => {
                tracing::info!(request_id, operation_id, "Operation approved");
                Ok(())
            }
            ApprovalDecision::Denied { reason } if reason == EXPIRED_REASON => {
                tracing::warn!(request_id, operation_id, "Confirmation timed out");
                Err(ConfirmationError::Timeout {
                    operation_id: operation_id.to_string(),
                })
            }
            ApprovalDecision::Denied { reason } => {
                tracing::warn!(request_id, operation_id, reason = %reason, "Operation denied");
                Err(ConfirmationError::Denied {
                    operation_id: operation_id.to_string(),
                    reason,
                })
            }
        }
    }
}

#[async_trait]
impl JobExecutor<SubmitRequest> for Pipeline {
    async fn execute(
        &self,
        job: &ClaimedJob<SubmitRequest>,
    ) -> Result<serde_json::Value, JobFailure> {
        let request_id = job.id.to_string();
        let deadline = self.queued_deadline(&job.payload);

        match self.run(&request_id, &job.payload, deadline).await {
            Ok(result) => {
                serde_json::to_value(&result).map_err(|e| JobFailure::permanent(e.to_string()))
            }
            Err(e) if e.is_retryable() => Err(JobFailure::retryable(e.to_string())),
            Err(e) => Err(JobFailure::permanent(e.to_string())),
        }
    }

    /// The job timeout bounds execution; an approval wait comes on top.
    fn time_limit(&self, job: &ClaimedJob<SubmitRequest>, job_timeout: Duration) -> Duration {
        match self.confirmation_wait(&job.payload) {
            Some((_, wait)) => job_timeout.saturating_add(wait),
            None => job_timeout,
        }
    }
}
