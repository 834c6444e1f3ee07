//! Priority job queue for deferred work
//!
//! Jobs are ordered by `(priority, insertion sequence)`: lower priority values
//! run first and ties run in submission order. A single mutex guards the heap
//! and the job table so claiming is atomic; idle workers park on a [`Notify`].
//!
//! Cancelled pending jobs stay in the heap and are skipped when popped.
//! Only an explicit [`JobQueue::cancel`] produces `Cancelled`; a job still
//! running when the worker pool shuts down ends `Failed` with
//! [`QueueError::Interrupted`] and is not retried.
//! Terminal jobs remain queryable for the retention window, then are purged.

mod job;
mod worker;

pub use job::{CancelOutcome, ClaimedJob, Job, JobHandle, JobStatus};
pub use worker::{spawn_retention_loop, JobExecutor, JobFailure, WorkerPool};

use crate::config::QueueConfig;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors from queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Pending depth reached `max_size`
    #[error("Queue is full ({max_size} pending jobs)")]
    Full { max_size: usize },

    /// Queue is disabled
    #[error("Job queuing is disabled")]
    Disabled,

    #[error("Job '{0}' not found")]
    NotFound(Uuid),

    /// Recorded as a failed job's error once its retries are spent
    #[error("Job retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Recorded as the error of a job whose run was cut short by pool shutdown
    #[error("Job interrupted by worker shutdown")]
    Interrupted,
}

struct Entry<P> {
    job: Job<P>,
    seq: u64,
    cancel: Option<CancellationToken>,
    finished: Option<Instant>,
}

struct Inner<P> {
    heap: BinaryHeap<Reverse<(i32, u64, Uuid)>>,
    jobs: HashMap<Uuid, Entry<P>>,
    pending: usize,
    next_seq: u64,
}

impl<P> Inner<P> {
    fn push(&mut self, id: Uuid, priority: i32) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((priority, seq, id)));
        self.pending += 1;
        seq
    }
}

/// Priority job queue shared by submitters and workers.
pub struct JobQueue<P> {
    inner: Mutex<Inner<P>>,
    notify: Notify,
    config: QueueConfig,
}

impl<P: Clone + Send + 'static> JobQueue<P> {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                jobs: HashMap::new(),
                pending: 0,
                next_seq: 0,
            }),
            notify: Notify::new(),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add a job. `max_retries` falls back to the configured default.
    pub fn enqueue(
        &self,
        payload: P,
        priority: i32,
        max_retries: Option<u32>,
    ) -> Result<JobHandle, QueueError> {
        if !self.config.is_enabled() {
            return Err(QueueError::Disabled);
        }

        let handle = {
            let mut inner = self.lock();
            if let Some(max_size) = self.config.capacity() {
                if inner.pending >= max_size {
                    return Err(QueueError::Full { max_size });
                }
            }

            let job = Job::new(
                payload,
                priority,
                max_retries.unwrap_or(self.config.default_max_retries),
            );
            let id = job.id;
            let seq = inner.push(id, priority);
            inner.jobs.insert(
                id,
                Entry {
                    job,
                    seq,
                    cancel: None,
                    finished: None,
                },
            );
            metrics::gauge!("gatekeeper_queue_depth").set(inner.pending as f64);

            JobHandle {
                id,
                priority,
                status: JobStatus::Pending,
            }
        };

        tracing::debug!(job_id = %handle.id, priority, "Job enqueued");
        self.notify.notify_one();
        Ok(handle)
    }

    /// Claim the highest-priority pending job without waiting.
    pub fn try_claim(&self) -> Option<ClaimedJob<P>> {
        let mut inner = self.lock();
        while let Some(Reverse((_, seq, id))) = inner.heap.pop() {
            let Some(entry) = inner.jobs.get_mut(&id) else {
                continue;
            };
            // Cancelled or superseded entries are skipped.
            if entry.job.status != JobStatus::Pending || entry.seq != seq {
                continue;
            }

            let token = CancellationToken::new();
            entry.job.set_status(JobStatus::Running);
            entry.cancel = Some(token.clone());
            let claimed = ClaimedJob {
                id,
                payload: entry.job.payload.clone(),
                attempt: entry.job.retry_count,
                cancel: token,
            };

            inner.pending -= 1;
            metrics::gauge!("gatekeeper_queue_depth").set(inner.pending as f64);
            return Some(claimed);
        }
        None
    }

    /// Claim the next job, waiting up to `wait` (forever when `None`).
    pub async fn next_job(&self, wait: Option<Duration>) -> Option<ClaimedJob<P>> {
        let deadline = wait.and_then(|w| Instant::now().checked_add(w));
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.try_claim() {
                return Some(job);
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.try_claim();
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Record a successful run.
    pub fn complete(&self, id: Uuid, output: serde_json::Value) -> Option<JobStatus> {
        let status = {
            let mut inner = self.lock();
            let entry = inner.jobs.get_mut(&id)?;
            if entry.job.status != JobStatus::Running {
                return Some(entry.job.status);
            }
            let cancelled = entry
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled);
            if cancelled {
                entry.job.set_status(JobStatus::Cancelled);
            } else {
                entry.job.output = Some(output);
                entry.job.set_status(JobStatus::Succeeded);
            }
            entry.cancel = None;
            entry.finished = Some(Instant::now());
            entry.job.status
        };
        record_terminal(id, status);
        Some(status)
    }

    /// Record a failed run. Retryable failures with retries left go back to
    /// the queue with the same priority behind jobs already waiting.
    pub fn fail(&self, id: Uuid, error: String, retryable: bool) -> Option<JobStatus> {
        let status = {
            let mut inner = self.lock();
            let entry = inner.jobs.get_mut(&id)?;
            if entry.job.status != JobStatus::Running {
                return Some(entry.job.status);
            }
            entry.cancel = None;

            if retryable && entry.job.retry_count < entry.job.max_retries {
                entry.job.retry_count += 1;
                entry.job.last_error = Some(error);
                entry.job.set_status(JobStatus::Pending);
                let priority = entry.job.priority;
                let attempt = entry.job.retry_count;
                let seq = inner.push(id, priority);
                if let Some(entry) = inner.jobs.get_mut(&id) {
                    entry.seq = seq;
                }
                metrics::gauge!("gatekeeper_queue_depth").set(inner.pending as f64);
                tracing::info!(job_id = %id, attempt, "Job re-enqueued for retry");
                JobStatus::Pending
            } else {
                let message = if retryable {
                    QueueError::RetriesExhausted {
                        attempts: entry.job.retry_count + 1,
                        last_error: error,
                    }
                    .to_string()
                } else {
                    error
                };
                entry.job.last_error = Some(message);
                entry.job.set_status(JobStatus::Failed);
                entry.finished = Some(Instant::now());
                JobStatus::Failed
            }
        };

        if status == JobStatus::Pending {
            self.notify.notify_one();
        } else {
            record_terminal(id, status);
        }
        Some(status)
    }

    /// Record that a running job observed its cancellation.
    pub fn finish_cancelled(&self, id: Uuid) -> Option<JobStatus> {
        {
            let mut inner = self.lock();
            let entry = inner.jobs.get_mut(&id)?;
            if entry.job.status != JobStatus::Running {
                return Some(entry.job.status);
            }
            entry.cancel = None;
            entry.job.set_status(JobStatus::Cancelled);
            entry.finished = Some(Instant::now());
        }
        record_terminal(id, JobStatus::Cancelled);
        Some(JobStatus::Cancelled)
    }

    /// Cancel a job.
    ///
    /// Pending jobs are cancelled immediately and will never be claimed.
    /// Running jobs are signalled and become Cancelled once their worker
    /// observes the signal.
    pub fn cancel(&self, id: Uuid) -> Result<CancelOutcome, QueueError> {
        let outcome = {
            let mut inner = self.lock();
            let entry = inner.jobs.get_mut(&id).ok_or(QueueError::NotFound(id))?;
            match entry.job.status {
                JobStatus::Pending => {
                    entry.job.set_status(JobStatus::Cancelled);
                    entry.finished = Some(Instant::now());
                    inner.pending -= 1;
                    metrics::gauge!("gatekeeper_queue_depth").set(inner.pending as f64);
                    CancelOutcome::Cancelled
                }
                JobStatus::Running => {
                    if let Some(token) = &entry.cancel {
                        token.cancel();
                    }
                    CancelOutcome::CancellationRequested
                }
                status => CancelOutcome::AlreadyFinished { status },
            }
        };

        match outcome {
            CancelOutcome::Cancelled => {
                tracing::info!(job_id = %id, "Pending job cancelled");
                record_terminal(id, JobStatus::Cancelled);
            }
            CancelOutcome::CancellationRequested => {
                tracing::info!(job_id = %id, "Cancellation requested for running job");
            }
            CancelOutcome::AlreadyFinished { .. } => {}
        }
        Ok(outcome)
    }

    /// Copy of a job record.
    pub fn get(&self, id: Uuid) -> Option<Job<P>> {
        self.lock().jobs.get(&id).map(|entry| entry.job.clone())
    }

    /// Number of pending jobs.
    pub fn depth(&self) -> usize {
        self.lock().pending
    }

    /// Number of job records held, in any state.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop terminal jobs that finished longer ago than the retention window.
    pub fn purge_expired(&self) -> usize {
        let retention = self.config.retention();
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner.jobs.retain(|_, entry| match entry.finished {
            Some(finished) => now.saturating_duration_since(finished) < retention,
            None => true,
        });
        before - inner.jobs.len()
    }
}

fn record_terminal(id: Uuid, status: JobStatus) {
    tracing::info!(job_id = %id, status = %status, "Job finished");
    metrics::counter!("gatekeeper_jobs_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue(config: QueueConfig) -> JobQueue<&'static str> {
        JobQueue::new(config)
    }

    fn default_queue() -> JobQueue<&'static str> {
        queue(QueueConfig::default())
    }

    #[test]
    fn claims_in_priority_order() {
        let q = default_queue();
        q.enqueue("three", 3, None).unwrap();
        q.enqueue("one", 1, None).unwrap();
        q.enqueue("two", 2, None).unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| q.try_claim().map(|j| j.payload)).collect();
        assert_eq!(order, vec!["one", "two", "three"]);
    }

    #[test]
    fn equal_priorities_are_fifo() {
        let q = default_queue();
        for name in ["a", "b", "c"] {
            q.enqueue(name, 0, None).unwrap();
        }
        let order: Vec<&str> = std::iter::from_fn(|| q.try_claim().map(|j| j.payload)).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn negative_priorities_run_first() {
        let q = default_queue();
        q.enqueue("normal", 0, None).unwrap();
        q.enqueue("urgent", -10, None).unwrap();
        assert_eq!(q.try_claim().unwrap().payload, "urgent");
    }

    #[test]
    fn full_queue_rejects() {
        let q = queue(QueueConfig {
            max_size: 2,
            ..Default::default()
        });
        q.enqueue("a", 0, None).unwrap();
        q.enqueue("b", 0, None).unwrap();
        assert_eq!(
            q.enqueue("c", 0, None).unwrap_err(),
            QueueError::Full { max_size: 2 }
        );

        // Claiming frees a slot.
        q.try_claim().unwrap();
        assert!(q.enqueue("c", 0, None).is_ok());
    }

    #[test]
    fn disabled_queue_rejects() {
        let q = queue(QueueConfig {
            enabled: false,
            ..Default::default()
        });
        assert_eq!(q.enqueue("a", 0, None).unwrap_err(), QueueError::Disabled);
    }

    #[test]
    fn cancelling_pending_job_skips_it() {
        let q = default_queue();
        let first = q.enqueue("first", 1, None).unwrap();
        q.enqueue("second", 2, None).unwrap();

        assert_eq!(q.cancel(first.id).unwrap(), CancelOutcome::Cancelled);
        assert_eq!(q.depth(), 1);
        assert_eq!(q.get(first.id).unwrap().status, JobStatus::Cancelled);

        let claimed = q.try_claim().unwrap();
        assert_eq!(claimed.payload, "second");
        assert!(q.try_claim().is_none());
        // Cancelled job was never started.
        assert!(q.get(first.id).unwrap().started_at.is_none());
    }

    #[test]
    fn cancelling_running_job_signals_token() {
        let q = default_queue();
        let handle = q.enqueue("work", 0, None).unwrap();
        let claimed = q.try_claim().unwrap();

        assert_eq!(
            q.cancel(handle.id).unwrap(),
            CancelOutcome::CancellationRequested
        );
        assert!(claimed.cancel.is_cancelled());
        assert_eq!(q.get(handle.id).unwrap().status, JobStatus::Running);

        assert_eq!(q.finish_cancelled(handle.id), Some(JobStatus::Cancelled));
        assert_eq!(
            q.cancel(handle.id).unwrap(),
            CancelOutcome::AlreadyFinished {
                status: JobStatus::Cancelled
            }
        );
    }

    #[test]
    fn cancel_unknown_job_is_not_found() {
        let q = default_queue();
        let id = Uuid::new_v4();
        assert_eq!(q.cancel(id).unwrap_err(), QueueError::NotFound(id));
    }

    #[test]
    fn complete_records_output() {
        let q = default_queue();
        let handle = q.enqueue("work", 0, None).unwrap();
        q.try_claim().unwrap();

        assert_eq!(
            q.complete(handle.id, json!({"ok": true})),
            Some(JobStatus::Succeeded)
        );
        let job = q.get(handle.id).unwrap();
        assert_eq!(job.output, Some(json!({"ok": true})));
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn retryable_failure_requeues_behind_waiting_jobs() {
        let q = default_queue();
        let flaky = q.enqueue("flaky", 0, Some(1)).unwrap();
        q.try_claim().unwrap();
        q.enqueue("later", 0, None).unwrap();

        assert_eq!(
            q.fail(flaky.id, "boom".to_string(), true),
            Some(JobStatus::Pending)
        );
        let job = q.get(flaky.id).unwrap();
        assert_eq!(job.retry_count, 1);
        assert_eq!(job.last_error.as_deref(), Some("boom"));

        assert_eq!(q.try_claim().unwrap().payload, "later");
        let retried = q.try_claim().unwrap();
        assert_eq!(retried.payload, "flaky");
        assert_eq!(retried.attempt, 1);
    }

    #[test]
    fn exhausted_retries_fail_job() {
        let q = default_queue();
        let handle = q.enqueue("flaky", 0, Some(0)).unwrap();
        q.try_claim().unwrap();

        assert_eq!(
            q.fail(handle.id, "boom".to_string(), true),
            Some(JobStatus::Failed)
        );
        let error = q.get(handle.id).unwrap().last_error.unwrap();
        assert!(error.contains("retries exhausted"), "{error}");
        assert!(error.contains("boom"));
    }

    #[test]
    fn non_retryable_failure_fails_immediately() {
        let q = default_queue();
        let handle = q.enqueue("denied", 0, Some(5)).unwrap();
        q.try_claim().unwrap();

        assert_eq!(
            q.fail(handle.id, "confirmation denied".to_string(), false),
            Some(JobStatus::Failed)
        );
        let job = q.get(handle.id).unwrap();
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.last_error.as_deref(), Some("confirmation denied"));
    }

    #[test]
    fn completion_after_cancel_request_is_cancelled() {
        let q = default_queue();
        let handle = q.enqueue("work", 0, None).unwrap();
        q.try_claim().unwrap();
        q.cancel(handle.id).unwrap();

        assert_eq!(
            q.complete(handle.id, json!(null)),
            Some(JobStatus::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn next_job_times_out_on_empty_queue() {
        let q = default_queue();
        let claimed = q.next_job(Some(Duration::from_millis(100))).await;
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn next_job_wakes_on_enqueue() {
        let q = std::sync::Arc::new(default_queue());
        let waiter = {
            let q = q.clone();
            tokio::spawn(async move { q.next_job(Some(Duration::from_secs(5))).await })
        };
        tokio::task::yield_now().await;
        q.enqueue("late", 0, None).unwrap();

        let claimed = waiter.await.unwrap().unwrap();
        assert_eq!(claimed.payload, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired_terminal_jobs() {
        let q = queue(QueueConfig {
            retention_seconds: 60,
            ..Default::default()
        });
        let done = q.enqueue("done", 0, None).unwrap();
        q.try_claim().unwrap();
        q.complete(done.id, json!(1));
        let waiting = q.enqueue("waiting", 0, None).unwrap();

        assert_eq!(q.purge_expired(), 0);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(q.purge_expired(), 1);

        assert!(q.get(done.id).is_none());
        assert!(q.get(waiting.id).is_some());
    }
}
