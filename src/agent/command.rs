//! Local command-line backend.
//!
//! Spawns a CLI tool per request, writes the payload text to its stdin and
//! returns captured stdout. The child is killed if the deadline elapses or the
//! invoking future is dropped.

use super::{AgentError, AgentResponse, BackendAgent, Payload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum stderr characters carried into an error message.
const MAX_STDERR_CHARS: usize = 512;

/// Agent that runs a local executable for every payload.
pub struct CommandAgent {
    id: String,
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl CommandAgent {
    pub fn new(id: String, program: String, args: Vec<String>, env: HashMap<String, String>) -> Self {
        Self {
            id,
            program,
            args,
            env,
        }
    }
}

#[async_trait]
impl BackendAgent for CommandAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "command"
    }

    async fn invoke(
        &self,
        payload: &Payload,
        deadline: Duration,
    ) -> Result<AgentResponse, AgentError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("TERM", "dumb")
            .env("NO_COLOR", "1")
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| AgentError::Process(format!("failed to spawn '{}': {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A tool that ignores stdin may close it early; that is not an error.
            if let Err(e) = stdin.write_all(payload.text.as_bytes()).await {
                tracing::debug!(backend_id = %self.id, error = %e, "stdin closed before payload was written");
            }
        }

        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| AgentError::Timeout(deadline.as_millis() as u64))?
            .map_err(|e| AgentError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(AgentError::Process(format!(
                "'{}' exited with {}: {}",
                self.program, output.status, stderr
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| AgentError::InvalidResponse(format!("stdout is not UTF-8: {}", e)))?;

        Ok(AgentResponse::text(stdout.trim_end()))
    }
}
