//! Orchestrator facade.
//!
//! Wires the registry, router, execution engine, job queue and confirmation
//! gate together and exposes the operations the HTTP API and embedders use.

mod error;
mod pipeline;
mod request;

pub use error::OrchestratorError;
pub use pipeline::Pipeline;
pub use request::{RequestResult, SubmitMode, SubmitRequest, Submission};

use crate::agent::{create_agent, AgentError};
use crate::breaker::CircuitSnapshot;
use crate::config::{ConfigError, GatekeeperConfig, NotifierConfig, NotifierKind};
use crate::confirmation::{
    ConfirmationGate, ConfirmationPolicy, ConfirmationRequest, ConfirmationStatus, GlobPolicy,
    LogNotifier, Notifier, WebhookNotifier,
};
use crate::engine::ExecutionEngine;
use crate::logging::generate_request_id;
use crate::queue::{
    spawn_retention_loop, CancelOutcome, Job, JobExecutor, JobQueue, QueueError, WorkerPool,
};
use crate::registry::Registry;
use crate::routing::Router;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// How often terminal jobs past retention are purged
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Background tasks started by [`Orchestrator::start`].
pub struct BackgroundTasks {
    workers: Option<WorkerPool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Number of queue workers running
    pub fn worker_count(&self) -> usize {
        self.workers.as_ref().map_or(0, WorkerPool::size)
    }

    /// Wait for every task to stop. Call after [`Orchestrator::shutdown`].
    pub async fn join(self) {
        if let Some(workers) = self.workers {
            workers.join().await;
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task panicked");
            }
        }
    }
}

/// The orchestration control plane.
pub struct Orchestrator {
    registry: Arc<Registry>,
    engine: Arc<ExecutionEngine>,
    gate: Arc<ConfirmationGate>,
    queue: Arc<JobQueue<SubmitRequest>>,
    pipeline: Arc<Pipeline>,
    request_timeout: Duration,
    reaper_interval: Duration,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Build from configuration: one agent per backend, the configured
    /// notifier and a glob policy over gated operation ids.
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, OrchestratorError> {
        let client = Arc::new(
            Client::builder()
                .build()
                .map_err(|e| AgentError::Configuration(e.to_string()))?,
        );

        let registry = Arc::new(Registry::new());
        for backend in &config.backends {
            let agent = create_agent(backend, Arc::clone(&client))?;
            registry.add_descriptor_with_agent(backend.to_descriptor(), agent)?;
        }

        let notifier = build_notifier(&config.confirmation.notifier, client)?;
        let policy = GlobPolicy::new(&config.confirmation.gated_operations).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: e.glob().unwrap_or_default().to_string(),
                message: e.kind().to_string(),
            }
        })?;

        tracing::info!(
            backends = registry.descriptor_count(),
            gated_patterns = policy.patterns().len(),
            notifier = notifier.name(),
            "Orchestrator configured"
        );

        Ok(Self::new(config, registry, notifier, Arc::new(policy)))
    }

    /// Build around an already populated registry.
    pub fn new(
        config: &GatekeeperConfig,
        registry: Arc<Registry>,
        notifier: Arc<dyn Notifier>,
        policy: Arc<dyn ConfirmationPolicy>,
    ) -> Self {
        let engine = Arc::new(ExecutionEngine::new(Arc::clone(&registry), config.breaker.clone()));
        let gate = Arc::new(ConfirmationGate::new(
            notifier,
            Duration::from_secs(config.confirmation.notifier.timeout_seconds.max(1)),
            config.confirmation.settled_retention(),
        ));
        let queue = Arc::new(JobQueue::new(config.queue.clone()));
        let pipeline = Arc::new(Pipeline {
            router: Router::new(Arc::clone(&registry), &config.routing),
            engine: Arc::clone(&engine),
            gate: Arc::clone(&gate),
            policy,
            confirmation_timeout: config.confirmation.default_timeout(),
            job_deadline: config.queue.job_timeout(),
            content_preview: config.logging.content_preview(),
        });

        Self {
            registry,
            engine,
            gate,
            queue,
            pipeline,
            request_timeout: config.server.request_timeout(),
            reaper_interval: config.confirmation.reaper_interval(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start the worker pool, job retention sweep and confirmation reaper.
    pub fn start(&self) -> BackgroundTasks {
        let mut handles = Vec::new();

        let workers = if self.queue.config().is_enabled() {
            let executor: Arc<dyn JobExecutor<SubmitRequest>> = self.pipeline.clone();
            let pool = WorkerPool::start(
                Arc::clone(&self.queue),
                executor,
                self.queue.config().workers,
                self.queue.config().job_timeout(),
                self.shutdown.child_token(),
            );
            handles.push(spawn_retention_loop(
                Arc::clone(&self.queue),
                RETENTION_SWEEP_INTERVAL,
                self.shutdown.child_token(),
            ));
            Some(pool)
        } else {
            tracing::info!("Job queue disabled");
            None
        };

        handles.push(
            Arc::clone(&self.gate).start_reaper(self.reaper_interval, self.shutdown.child_token()),
        );

        BackgroundTasks { workers, handles }
    }

    /// Signal background tasks to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Run a request now, or enqueue it when it asks for queued mode.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission, OrchestratorError> {
        match request.mode {
            SubmitMode::Queued => {
                let priority = request.priority;
                let max_retries = request.max_retries;
                let handle = self.queue.enqueue(request, priority, max_retries)?;
                Ok(Submission::Queued(handle))
            }
            SubmitMode::Immediate => {
                let request_id = generate_request_id();
                let deadline = request.deadline().unwrap_or(self.request_timeout);
                let result = self.pipeline.run(&request_id, &request, deadline).await?;
                Ok(Submission::Completed(Box::new(result)))
            }
        }
    }

    pub fn job_status(&self, id: Uuid) -> Result<Job<SubmitRequest>, OrchestratorError> {
        self.queue
            .get(id)
            .ok_or(OrchestratorError::Queue(QueueError::NotFound(id)))
    }

    pub fn cancel_job(&self, id: Uuid) -> Result<CancelOutcome, OrchestratorError> {
        Ok(self.queue.cancel(id)?)
    }

    /// Approve a pending confirmation. Returns the request's status afterwards.
    pub fn approve(&self, id: Uuid) -> Result<ConfirmationStatus, OrchestratorError> {
        Ok(self.gate.approve(id)?)
    }

    /// Deny a pending confirmation. Returns the request's status afterwards.
    pub fn deny(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<ConfirmationStatus, OrchestratorError> {
        Ok(self.gate.deny(id, reason)?)
    }

    pub fn confirmation(&self, id: Uuid) -> Option<ConfirmationRequest> {
        self.gate.get(id)
    }

    /// Pending confirmations, oldest first.
    pub fn pending_confirmations(&self) -> Vec<ConfirmationRequest> {
        self.gate.pending()
    }

    /// Circuit snapshot for every registered backend.
    pub fn health(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.engine.health()
    }

    /// Force a backend's circuit back to Closed.
    pub fn reset_circuit(&self, id: &str) -> Result<CircuitSnapshot, OrchestratorError> {
        Ok(self.engine.reset(id)?)
    }

    /// Jobs waiting to run
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }
}

fn build_notifier(
    config: &NotifierConfig,
    client: Arc<Client>,
) -> Result<Arc<dyn Notifier>, ConfigError> {
    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config.url.clone().ok_or_else(|| {
                ConfigError::validation("confirmation.notifier.url", "required for webhook notifier")
            })?;
            Ok(Arc::new(WebhookNotifier::new(
                url,
                client,
                Duration::from_secs(config.timeout_seconds.max(1)),
            )))
        }
    }
}
