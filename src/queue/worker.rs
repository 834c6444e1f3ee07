//! Worker pool draining the job queue.

use super::{ClaimedJob, JobQueue, JobStatus, QueueError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Why a job run did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
    /// Whether another attempt could succeed
    pub retryable: bool,
}

impl JobFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Runs one claimed job.
///
/// Implementations must be cancellation safe: the worker drops the returned
/// future when the job is cancelled or times out.
#[async_trait]
pub trait JobExecutor<P>: Send + Sync + 'static {
    async fn execute(&self, job: &ClaimedJob<P>) -> Result<serde_json::Value, JobFailure>;

    /// Wall-clock limit for one run of `job`, given the pool's job timeout.
    ///
    /// Executors that spend part of a run waiting on something other than
    /// work (an approval, say) extend the limit by that wait.
    fn time_limit(&self, _job: &ClaimedJob<P>, job_timeout: Duration) -> Duration {
        job_timeout
    }
}

/// Fixed-size pool of workers sharing one queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks that claim and run jobs until `shutdown` fires.
    pub fn start<P>(
        queue: Arc<JobQueue<P>>,
        executor: Arc<dyn JobExecutor<P>>,
        workers: usize,
        job_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self
    where
        P: Clone + Send + Sync + 'static,
    {
        let handles = (0..workers)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let executor = Arc::clone(&executor);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, queue, executor, job_timeout, shutdown).await;
                })
            })
            .collect();

        tracing::info!(workers, "Worker pool started");
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
    }
}

enum Run {
    Cancelled,
    Interrupted,
    Finished(Result<Result<serde_json::Value, JobFailure>, tokio::time::error::Elapsed>),
}

async fn worker_loop<P>(
    worker_id: usize,
    queue: Arc<JobQueue<P>>,
    executor: Arc<dyn JobExecutor<P>>,
    job_timeout: Duration,
    shutdown: CancellationToken,
) where
    P: Clone + Send + Sync + 'static,
{
    tracing::debug!(worker_id, "Worker started");

    loop {
        let claimed = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = queue.next_job(None) => job,
        };
        let Some(job) = claimed else {
            continue;
        };

        let limit = executor.time_limit(&job, job_timeout);
        tracing::info!(worker_id, job_id = %job.id, attempt = job.attempt, "Job started");

        let result = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => Run::Cancelled,
            _ = shutdown.cancelled() => Run::Interrupted,
            result = tokio::time::timeout(limit, executor.execute(&job)) => Run::Finished(result),
        };

        let status = match result {
            Run::Cancelled => queue.finish_cancelled(job.id),
            Run::Interrupted => {
                tracing::warn!(worker_id, job_id = %job.id, "Job interrupted by shutdown");
                queue.fail(job.id, QueueError::Interrupted.to_string(), false)
            }
            Run::Finished(Ok(Ok(output))) => queue.complete(job.id, output),
            Run::Finished(Ok(Err(failure))) => {
                tracing::warn!(
                    worker_id,
                    job_id = %job.id,
                    error = %failure.message,
                    retryable = failure.retryable,
                    "Job run failed"
                );
                queue.fail(job.id, failure.message, failure.retryable)
            }
            Run::Finished(Err(_)) => {
                let message = format!("job timed out after {limit:?}");
                tracing::warn!(worker_id, job_id = %job.id, "Job run timed out");
                queue.fail(job.id, message, true)
            }
        };

        if status == Some(JobStatus::Cancelled) {
            tracing::info!(worker_id, job_id = %job.id, "Running job cancelled");
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}

/// Periodically purge terminal jobs past their retention window.
pub fn spawn_retention_loop<P>(
    queue: Arc<JobQueue<P>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    P: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let purged = queue.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired jobs");
                    }
                }
            }
        }
    })
}
