use super::*;
use crate::agent::{AgentError, AgentResponse, Payload};
use async_trait::async_trait;
use std::time::Duration;

fn descriptor(id: &str) -> ModelDescriptor {
    ModelDescriptor::new(id, format!("Backend {}", id), Capabilities::default())
}

struct NullAgent(String);

#[async_trait]
impl BackendAgent for NullAgent {
    fn id(&self) -> &str {
        &self.0
    }

    fn kind(&self) -> &'static str {
        "null"
    }

    async fn invoke(&self, _: &Payload, _: Duration) -> Result<AgentResponse, AgentError> {
        Ok(AgentResponse::text(""))
    }
}

#[test]
fn test_capabilities_default_to_middle_tier() {
    let caps = Capabilities::default();
    assert_eq!(caps.speed_tier, 3);
    assert_eq!(caps.quality_tier, 3);
    assert_eq!(caps.cost_tier, 3);
    assert!(!caps.supports_code);
    assert!(!caps.supports_tools);
}

#[test]
fn test_descriptor_json_roundtrip() {
    let mut d = descriptor("a");
    d.metadata.insert("kind".to_string(), "http".to_string());
    let json = serde_json::to_string(&d).unwrap();
    let back: ModelDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
}

#[test]
fn test_error_display() {
    assert_eq!(
        RegistryError::DuplicateDescriptor("a".to_string()).to_string(),
        "descriptor already exists: a"
    );
    assert_eq!(
        RegistryError::DescriptorNotFound("b".to_string()).to_string(),
        "descriptor not found: b"
    );
}

#[test]
fn test_registry_new_empty() {
    let registry = Registry::new();
    assert_eq!(registry.descriptor_count(), 0);
    assert_eq!(registry.healthy_count(), 0);
    assert!(registry.list(&DescriptorFilter::all()).is_empty());
}

#[test]
fn test_add_descriptor_duplicate_error() {
    let registry = Registry::new();
    registry.add_descriptor(descriptor("a")).unwrap();

    let err = registry.add_descriptor(descriptor("a")).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateDescriptor(id) if id == "a"));
    assert_eq!(registry.descriptor_count(), 1);
}

#[test]
fn test_add_descriptor_with_agent_and_get_agent() {
    let registry = Registry::new();
    registry
        .add_descriptor_with_agent(descriptor("a"), Arc::new(NullAgent("a".to_string())))
        .unwrap();

    assert_eq!(registry.get_agent("a").unwrap().id(), "a");
    assert!(registry.get_agent("b").is_none());
}

#[test]
fn test_add_descriptor_with_agent_duplicate_keeps_original() {
    let registry = Registry::new();
    registry
        .add_descriptor_with_agent(descriptor("a"), Arc::new(NullAgent("first".to_string())))
        .unwrap();

    assert!(registry
        .add_descriptor_with_agent(descriptor("a"), Arc::new(NullAgent("second".to_string())))
        .is_err());
    assert_eq!(registry.get_agent("a").unwrap().id(), "first");
}

#[test]
fn test_list_is_sorted_by_id() {
    let registry = Registry::new();
    for id in ["c", "a", "b"] {
        registry.add_descriptor(descriptor(id)).unwrap();
    }
    let ids: Vec<String> = registry
        .list(&DescriptorFilter::all())
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn test_list_filters_capabilities() {
    let registry = Registry::new();
    let mut coder = descriptor("coder");
    coder.capabilities.supports_code = true;
    let mut tools = descriptor("tools");
    tools.capabilities.supports_tools = true;
    registry.add_descriptor(coder).unwrap();
    registry.add_descriptor(tools).unwrap();
    registry.add_descriptor(descriptor("plain")).unwrap();

    let code_only = registry.list(&DescriptorFilter {
        needs_code: true,
        ..DescriptorFilter::default()
    });
    assert_eq!(code_only.len(), 1);
    assert_eq!(code_only[0].id, "coder");

    let both = registry.list(&DescriptorFilter {
        needs_code: true,
        needs_tools: true,
        ..DescriptorFilter::default()
    });
    assert!(both.is_empty());
}

#[test]
fn test_mark_unhealthy_sets_error_and_excludes() {
    let registry = Registry::new();
    registry.add_descriptor(descriptor("a")).unwrap();
    registry.add_descriptor(descriptor("b")).unwrap();

    assert!(registry
        .mark_unhealthy("a", Some("circuit open".to_string()))
        .unwrap());

    let a = registry.get("a").unwrap();
    assert!(!a.healthy);
    assert_eq!(a.last_error.as_deref(), Some("circuit open"));
    assert_eq!(registry.healthy_count(), 1);

    let healthy = registry.list(&DescriptorFilter::healthy());
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].id, "b");
}

#[test]
fn test_mark_healthy_clears_error() {
    let registry = Registry::new();
    registry.add_descriptor(descriptor("a")).unwrap();
    registry.mark_unhealthy("a", Some("boom".to_string())).unwrap();

    assert!(registry.mark_healthy("a").unwrap());
    let a = registry.get("a").unwrap();
    assert!(a.healthy);
    assert!(a.last_error.is_none());
}

#[test]
fn test_health_change_is_idempotent() {
    let registry = Registry::new();
    registry.add_descriptor(descriptor("a")).unwrap();

    assert!(!registry.mark_healthy("a").unwrap());
    let before = registry.get("a").unwrap().last_health_change;
    assert!(!registry.mark_healthy("a").unwrap());
    assert_eq!(registry.get("a").unwrap().last_health_change, before);
}

#[test]
fn test_health_updates_unknown_id() {
    let registry = Registry::new();
    assert!(matches!(
        registry.mark_healthy("missing"),
        Err(RegistryError::DescriptorNotFound(_))
    ));
    assert!(registry.mark_unhealthy("missing", None).is_err());
    assert!(registry.record_success("missing").is_err());
}

#[test]
fn test_record_success_sets_timestamp() {
    let registry = Registry::new();
    registry.add_descriptor(descriptor("a")).unwrap();
    assert!(registry.get("a").unwrap().last_success.is_none());

    registry.record_success("a").unwrap();
    assert!(registry.get("a").unwrap().last_success.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_health_flips_no_deadlock() {
    let registry = Arc::new(Registry::new());
    for i in 0..8 {
        registry.add_descriptor(descriptor(&format!("b{}", i))).unwrap();
    }

    let mut handles = Vec::new();
    for task in 0..16 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            for round in 0..200 {
                let id = format!("b{}", (task + round) % 8);
                if round % 2 == 0 {
                    registry.mark_unhealthy(&id, None).unwrap();
                } else {
                    registry.mark_healthy(&id).unwrap();
                }
                let _ = registry.list(&DescriptorFilter::healthy());
                registry.record_success(&id).unwrap();
            }
        }));
    }

    let all = futures::future::join_all(handles);
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("registry operations deadlocked")
        .into_iter()
        .for_each(|r| r.unwrap());

    assert_eq!(registry.descriptor_count(), 8);
    assert!(registry.healthy_count() <= 8);
}
