//! Confirmation request records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Resolution state of a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl ConfirmationStatus {
    pub fn is_settled(self) -> bool {
        self != ConfirmationStatus::Pending
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Approved => "approved",
            ConfirmationStatus::Denied => "denied",
            ConfirmationStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Who is asking, for the approver's benefit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Input to [`ConfirmationGate::request_approval`](super::ConfirmationGate::request_approval).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(default)]
    pub context: RequestContext,
    pub operation_id: String,
    pub description: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ApprovalRequest {
    pub fn new(operation_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            context: RequestContext::default(),
            operation_id: operation_id.into(),
            description: description.into(),
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A confirmation request as stored by the gate and shown to approvers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationRequest {
    pub id: Uuid,
    pub context: RequestContext,
    pub operation_id: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ConfirmationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// What the suspended caller learns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    /// Explicit denial, or expiry with reason "expired"
    Denied { reason: String },
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved)
    }

    pub(crate) fn from_settled(status: ConfirmationStatus, reason: Option<&str>) -> Self {
        match status {
            ConfirmationStatus::Approved => ApprovalDecision::Approved,
            ConfirmationStatus::Expired => ApprovalDecision::Denied {
                reason: super::EXPIRED_REASON.to_string(),
            },
            ConfirmationStatus::Denied | ConfirmationStatus::Pending => ApprovalDecision::Denied {
                reason: reason.unwrap_or("denied").to_string(),
            },
        }
    }
}
