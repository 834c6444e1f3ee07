//! OpenAI-compatible HTTP agent.
//!
//! Sends the payload as a single-turn `POST /v1/chat/completions` request and
//! returns the first choice's message content.

use super::{AgentError, AgentResponse, BackendAgent, Payload};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Agent for any backend exposing an OpenAI-compatible chat completions API.
pub struct HttpAgent {
    /// Descriptor id
    id: String,
    /// Base URL (e.g., "http://localhost:8000")
    base_url: String,
    /// Model name sent in the request body
    model: String,
    /// Bearer token, resolved from the environment at construction
    api_key: Option<String>,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl HttpAgent {
    pub fn new(
        id: String,
        base_url: String,
        model: String,
        api_key: Option<String>,
        client: Arc<Client>,
    ) -> Self {
        Self {
            id,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl BackendAgent for HttpAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    async fn invoke(
        &self,
        payload: &Payload,
        deadline: Duration,
    ) -> Result<AgentResponse, AgentError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let deadline_ms = deadline.as_millis() as u64;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &payload.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": payload.text}));

        let mut req = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "stream": false,
            }))
            .timeout(deadline);

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, deadline_ms))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::InvalidResponse("Response has no choices".to_string()))?;

        Ok(AgentResponse {
            content,
            model: completion.model,
        })
    }
}
