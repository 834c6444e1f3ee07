//! Submission types accepted and returned by the orchestrator.

use crate::classifier::{TaskClassification, TaskType};
use crate::confirmation::RequestContext;
use crate::engine::ExecutionOutcome;
use crate::queue::JobHandle;
use crate::routing::{RoutingStrategy, ScoredCandidate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a submission should be run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Run on the caller's task and return the result
    #[default]
    Immediate,
    /// Hand to the worker pool and return a job handle
    Queued,
}

/// A natural-language request plus how to run it.
///
/// # Examples
///
/// ```
/// use gatekeeper::orchestrator::{SubmitMode, SubmitRequest};
/// use gatekeeper::routing::RoutingStrategy;
///
/// let request = SubmitRequest::new("Refactor the parser module")
///     .with_strategy(RoutingStrategy::Quality)
///     .queued(5);
/// assert_eq!(request.mode, SubmitMode::Queued);
/// assert_eq!(request.priority, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
    /// Operation identifier checked against the confirmation policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Shown to approvers; defaults to the request text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
    /// Overrides the configured routing strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RoutingStrategy>,
    #[serde(default)]
    pub needs_tools: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub context: RequestContext,
    #[serde(default)]
    pub mode: SubmitMode,
    /// Lower runs first (queued mode only)
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Execution deadline, excluding time spent awaiting confirmation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_ms: Option<u64>,
}

impl SubmitRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            operation_id: None,
            description: None,
            parameters: serde_json::Value::Null,
            strategy: None,
            needs_tools: false,
            system: None,
            context: RequestContext::default(),
            mode: SubmitMode::Immediate,
            priority: 0,
            max_retries: None,
            deadline_ms: None,
            confirmation_timeout_ms: None,
        }
    }

    pub fn with_operation(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Run through the job queue at the given priority.
    pub fn queued(mut self, priority: i32) -> Self {
        self.mode = SubmitMode::Queued;
        self.priority = priority;
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }
}

/// Everything known about a completed request
#[derive(Debug, Clone, Serialize)]
pub struct RequestResult {
    pub request_id: String,
    pub classification: TaskClassification,
    pub task_type: TaskType,
    pub strategy: RoutingStrategy,
    /// Ranked candidates the engine worked through
    pub candidates: Vec<ScoredCandidate>,
    pub outcome: ExecutionOutcome,
}

/// Result of [`Orchestrator::submit`](super::Orchestrator::submit)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    Completed(Box<RequestResult>),
    Queued(JobHandle),
}
