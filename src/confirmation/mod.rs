//! Human-in-the-loop confirmation gate.
//!
//! A gated call registers a [`ConfirmationRequest`], announces it through a
//! [`Notifier`] and suspends until an approver answers or the timeout fires.
//! Each request owns a single-use completion signal; whichever of approve,
//! deny, timeout or the reaper reaches the slot first settles it, and every
//! later attempt just reads the settled status.

mod notifier;
mod policy;
mod request;

pub use notifier::{ChannelNotifier, LogNotifier, Notifier, NotifierError, WebhookNotifier};
pub use policy::{ConfirmationPolicy, GlobPolicy};
pub use request::{
    ApprovalDecision, ApprovalRequest, ConfirmationRequest, ConfirmationStatus, RequestContext,
};

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Reason attached to requests that timed out.
pub const EXPIRED_REASON: &str = "expired";

/// Errors surfaced by the confirmation gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("Operation '{operation_id}' denied: {reason}")]
    Denied { operation_id: String, reason: String },

    #[error("Operation '{operation_id}' was not approved in time")]
    Timeout { operation_id: String },

    #[error("Confirmation request '{0}' not found")]
    NotFound(Uuid),
}

struct Slot {
    request: ConfirmationRequest,
    waiter: Option<oneshot::Sender<ConfirmationStatus>>,
    deadline: Instant,
    settled_at: Option<Instant>,
}

/// Settles an abandoned wait so the slot does not linger until the reaper runs.
struct WaitGuard<'a> {
    gate: &'a ConfirmationGate,
    id: Uuid,
    armed: bool,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .gate
                .resolve(self.id, ConfirmationStatus::Expired, Some("abandoned".to_string()));
        }
    }
}

/// Registry of confirmation requests and their waiters.
pub struct ConfirmationGate {
    slots: DashMap<Uuid, Slot>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
    retention: Duration,
}

impl ConfirmationGate {
    pub fn new(notifier: Arc<dyn Notifier>, notify_timeout: Duration, retention: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            notifier,
            notify_timeout,
            retention,
        }
    }

    /// Suspend until the request is approved, denied or times out.
    ///
    /// A zero timeout expires immediately without notifying anyone.
    pub async fn request_approval(
        &self,
        request: ApprovalRequest,
        timeout: Duration,
    ) -> ApprovalDecision {
        let now = Instant::now();
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        let deadline = now.checked_add(timeout);

        let id = Uuid::new_v4();
        let record = ConfirmationRequest {
            id,
            context: request.context,
            operation_id: request.operation_id,
            description: request.description,
            parameters: request.parameters,
            created_at,
            expires_at,
            status: ConfirmationStatus::Pending,
            reason: None,
            resolved_at: None,
        };

        if timeout.is_zero() {
            let mut record = record;
            record.status = ConfirmationStatus::Expired;
            record.reason = Some(EXPIRED_REASON.to_string());
            record.resolved_at = Some(created_at);
            tracing::info!(
                confirmation_id = %id,
                operation_id = %record.operation_id,
                "Zero timeout, confirmation expired immediately"
            );
            self.slots.insert(
                id,
                Slot {
                    request: record,
                    waiter: None,
                    deadline: now,
                    settled_at: Some(now),
                },
            );
            record_resolution(ConfirmationStatus::Expired);
            return ApprovalDecision::Denied {
                reason: EXPIRED_REASON.to_string(),
            };
        }

        let (tx, rx) = oneshot::channel();
        let announced = record.clone();
        self.slots.insert(
            id,
            Slot {
                request: record,
                waiter: Some(tx),
                deadline: deadline.unwrap_or_else(|| now + Duration::from_secs(86_400 * 365)),
                settled_at: None,
            },
        );
        metrics::gauge!("gatekeeper_confirmations_pending").increment(1.0);

        let mut guard = WaitGuard {
            gate: self,
            id,
            armed: true,
        };

        tracing::info!(
            confirmation_id = %id,
            operation_id = %announced.operation_id,
            timeout_ms = timeout.as_millis() as u64,
            "Awaiting confirmation"
        );

        match tokio::time::timeout(self.notify_timeout, self.notifier.notify(&announced)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(confirmation_id = %id, notifier = self.notifier.name(), error = %e, "Notifier failed");
            }
            Err(_) => {
                tracing::warn!(confirmation_id = %id, notifier = self.notifier.name(), "Notifier timed out");
            }
        }

        let status = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, rx).await {
                Ok(Ok(status)) => status,
                Ok(Err(_)) => self.settled_status(id),
                Err(_) => self
                    .resolve(id, ConfirmationStatus::Expired, Some(EXPIRED_REASON.to_string()))
                    .unwrap_or(ConfirmationStatus::Expired),
            },
            None => match rx.await {
                Ok(status) => status,
                Err(_) => self.settled_status(id),
            },
        };
        guard.armed = false;

        let reason = self.get(id).and_then(|r| r.reason);
        ApprovalDecision::from_settled(status, reason.as_deref())
    }

    fn settled_status(&self, id: Uuid) -> ConfirmationStatus {
        self.slots
            .get(&id)
            .map(|slot| slot.request.status)
            .filter(|status| status.is_settled())
            .unwrap_or(ConfirmationStatus::Expired)
    }

    /// Approve a pending request. Returns the settled status, which is not
    /// `Approved` if another resolution got there first.
    pub fn approve(&self, id: Uuid) -> Result<ConfirmationStatus, ConfirmationError> {
        self.resolve(id, ConfirmationStatus::Approved, None)
    }

    /// Deny a pending request. Returns the settled status.
    pub fn deny(&self, id: Uuid, reason: Option<String>) -> Result<ConfirmationStatus, ConfirmationError> {
        self.resolve(
            id,
            ConfirmationStatus::Denied,
            Some(reason.unwrap_or_else(|| "denied".to_string())),
        )
    }

    fn resolve(
        &self,
        id: Uuid,
        status: ConfirmationStatus,
        reason: Option<String>,
    ) -> Result<ConfirmationStatus, ConfirmationError> {
        let (waiter, operation_id) = {
            let mut slot = self
                .slots
                .get_mut(&id)
                .ok_or(ConfirmationError::NotFound(id))?;
            if slot.request.status.is_settled() {
                return Ok(slot.request.status);
            }
            slot.request.status = status;
            slot.request.reason = reason;
            slot.request.resolved_at = Some(Utc::now());
            slot.settled_at = Some(Instant::now());
            (slot.waiter.take(), slot.request.operation_id.clone())
        };

        tracing::info!(
            confirmation_id = %id,
            operation_id = %operation_id,
            resolution = %status,
            "Confirmation resolved"
        );
        metrics::gauge!("gatekeeper_confirmations_pending").decrement(1.0);
        record_resolution(status);

        if let Some(waiter) = waiter {
            // The waiter may already be gone; the slot keeps the status.
            let _ = waiter.send(status);
        }
        Ok(status)
    }

    pub fn get(&self, id: Uuid) -> Option<ConfirmationRequest> {
        self.slots.get(&id).map(|slot| slot.request.clone())
    }

    /// Pending requests, oldest first.
    pub fn pending(&self) -> Vec<ConfirmationRequest> {
        let mut pending: Vec<ConfirmationRequest> = self
            .slots
            .iter()
            .filter(|slot| slot.request.status == ConfirmationStatus::Pending)
            .map(|slot| slot.request.clone())
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }

    /// Expire every pending request past its deadline. Returns how many.
    pub fn expire_overdue(&self) -> usize {
        let now = Instant::now();
        let overdue: Vec<Uuid> = self
            .slots
            .iter()
            .filter(|slot| slot.request.status == ConfirmationStatus::Pending && slot.deadline <= now)
            .map(|slot| *slot.key())
            .collect();

        overdue
            .into_iter()
            .filter(|id| {
                matches!(
                    self.resolve(*id, ConfirmationStatus::Expired, Some(EXPIRED_REASON.to_string())),
                    Ok(ConfirmationStatus::Expired)
                )
            })
            .count()
    }

    /// Forget settled requests older than the retention window.
    pub fn purge_settled(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.settled_at {
            Some(settled) => now.saturating_duration_since(settled) < self.retention,
            None => true,
        });
        before.saturating_sub(self.slots.len())
    }

    /// Spawn the background reaper.
    pub fn start_reaper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(interval_ms = interval.as_millis() as u64, "Confirmation reaper started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Confirmation reaper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let expired = self.expire_overdue();
                        let purged = self.purge_settled();
                        if expired > 0 || purged > 0 {
                            tracing::debug!(expired, purged, "Confirmation reaper pass");
                        }
                    }
                }
            }
        })
    }
}

fn record_resolution(status: ConfirmationStatus) {
    metrics::counter!("gatekeeper_confirmations_total", "resolution" => status.to_string())
        .increment(1);
}
