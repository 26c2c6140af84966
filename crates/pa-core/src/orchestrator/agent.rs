//! Agent capability trait
//!
//! The external executor that carries out a single subtask. How it does so
//! (HTTP calls, browser automation, ...) is opaque to the orchestrator.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure signaled by an agent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct AgentError {
    pub reason: String,
    /// Whether running the same prompt again may succeed
    pub retryable: bool,
}

impl AgentError {
    pub fn new(reason: impl Into<String>, retryable: bool) -> Self {
        Self {
            reason: reason.into(),
            retryable,
        }
    }

    /// A failure worth retrying (rate limits, transport errors)
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::new(reason, true)
    }

    /// A failure that will recur on retry
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::new(reason, false)
    }

    /// The agent stopped because it was asked to
    pub fn cancelled() -> Self {
        Self::transient("cancelled")
    }
}

/// Executes one subtask prompt and returns a structured value
///
/// Implementations should watch `cancel` and return promptly once it fires.
/// The dispatcher aborts executions that ignore it after a grace period.
#[async_trait]
pub trait AgentCapability: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str {
        "agent"
    }

    /// Execute a subtask prompt
    async fn execute(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> std::result::Result<JsonValue, AgentError>;
}
