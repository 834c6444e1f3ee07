//! Notifiers announce new confirmation requests to approvers.

use super::ConfirmationRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while delivering a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification endpoint returned {0}")]
    Status(u16),

    #[error("Notification channel closed")]
    Closed,
}

/// Pluggable outbound announcement of a pending confirmation.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    async fn notify(&self, request: &ConfirmationRequest) -> Result<(), NotifierError>;
}

/// Writes a structured log event per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, request: &ConfirmationRequest) -> Result<(), NotifierError> {
        tracing::warn!(
            confirmation_id = %request.id,
            operation_id = %request.operation_id,
            caller_id = request.context.caller_id.as_deref().unwrap_or(""),
            expires_at = %request.expires_at,
            description = %request.description,
            "Approval required"
        );
        Ok(())
    }
}

/// POSTs each request as JSON to a fixed URL.
pub struct WebhookNotifier {
    url: String,
    client: Arc<Client>,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, client: Arc<Client>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client,
            timeout,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, request: &ConfirmationRequest) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&json!({
                "event": "confirmation_requested",
                "request": request,
            }))
            .send()
            .await
            .map_err(|e| NotifierError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifierError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Forwards requests into an in-process channel, for adapters that render
/// approvals themselves.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<ConfirmationRequest>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ConfirmationRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn notify(&self, request: &ConfirmationRequest) -> Result<(), NotifierError> {
        self.tx
            .send(request.clone())
            .await
            .map_err(|_| NotifierError::Closed)
    }
}
