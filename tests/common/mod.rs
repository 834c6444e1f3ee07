//! Shared test utilities for integration tests.
//!
//! Provides a scripted backend agent and helpers for building registries,
//! orchestrators and API routers around it.

#![allow(dead_code)]

use async_trait::async_trait;
use gatekeeper::agent::{AgentError, AgentResponse, BackendAgent, Payload};
use gatekeeper::api::{create_router, AppState};
use gatekeeper::config::GatekeeperConfig;
use gatekeeper::confirmation::{ChannelNotifier, ConfirmationRequest, GlobPolicy};
use gatekeeper::orchestrator::Orchestrator;
use gatekeeper::registry::{Capabilities, ModelDescriptor, Registry};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What a scripted agent does on one call
#[derive(Debug, Clone)]
pub enum Step {
    Reply,
    Fail,
    Sleep(Duration),
}

/// Agent that plays back a script of outcomes, repeating the last step.
pub struct ScriptedAgent {
    id: String,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(id: &str, script: Vec<Step>) -> Arc<Self> {
        let fallback = script.last().cloned().unwrap_or(Step::Reply);
        Arc::new(Self {
            id: id.to_string(),
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok(id: &str) -> Arc<Self> {
        Self::new(id, vec![Step::Reply])
    }

    pub fn failing(id: &str) -> Arc<Self> {
        Self::new(id, vec![Step::Fail])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendAgent for ScriptedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn invoke(
        &self,
        payload: &Payload,
        _deadline: Duration,
    ) -> Result<AgentResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply => Ok(AgentResponse::text(format!("{} handled: {}", self.id, payload.text))),
            Step::Fail => Err(AgentError::Upstream {
                status: 500,
                message: format!("{} failed", self.id),
            }),
            Step::Sleep(d) => {
                tokio::time::sleep(d).await;
                Ok(AgentResponse::text(format!("{} slept", self.id)))
            }
        }
    }
}

pub fn caps(speed: u8, quality: u8, cost: u8, code: bool) -> Capabilities {
    Capabilities {
        speed_tier: speed,
        quality_tier: quality,
        cost_tier: cost,
        supports_code: code,
        supports_tools: false,
    }
}

/// Registry holding one descriptor per agent.
pub fn registry_with(backends: &[(Arc<ScriptedAgent>, Capabilities)]) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    for (agent, capabilities) in backends {
        let id = agent.id().to_string();
        registry
            .add_descriptor_with_agent(
                ModelDescriptor::new(id.clone(), id, *capabilities),
                agent.clone(),
            )
            .unwrap();
    }
    registry
}

/// An orchestrator gating `gated` patterns, announcing approvals on a channel.
pub struct TestOrchestrator {
    pub orchestrator: Arc<Orchestrator>,
    pub approvals: mpsc::Receiver<ConfirmationRequest>,
    pub agents: BTreeMap<String, Arc<ScriptedAgent>>,
}

pub fn orchestrator_with(
    config: &GatekeeperConfig,
    backends: &[(Arc<ScriptedAgent>, Capabilities)],
    gated: &[&str],
) -> TestOrchestrator {
    let registry = registry_with(backends);
    let (notifier, approvals) = ChannelNotifier::new(16);
    let patterns: Vec<String> = gated.iter().map(|p| p.to_string()).collect();
    let orchestrator = Orchestrator::new(
        config,
        registry,
        Arc::new(notifier),
        Arc::new(GlobPolicy::new(&patterns).unwrap()),
    );

    TestOrchestrator {
        orchestrator: Arc::new(orchestrator),
        approvals,
        agents: backends
            .iter()
            .map(|(agent, _)| (agent.id().to_string(), agent.clone()))
            .collect(),
    }
}

pub fn test_app(orchestrator: Arc<Orchestrator>) -> axum::Router {
    create_router(Arc::new(AppState::new(orchestrator)))
}
