//! LLM-backed agent capability

use std::sync::LazyLock;

use async_trait::async_trait;
use pa_core::{AgentCapability, AgentError, CancellationToken};
use regex::Regex;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use crate::client::LlmClient;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

const DEFAULT_SYSTEM_PROMPT: &str = "You answer one self-contained question. When the answer \
has several fields, reply with a single JSON object and nothing else.";

/// Answers each subtask prompt with one model call
pub struct LlmAgent {
    client: LlmClient,
    system_prompt: String,
}

impl LlmAgent {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

#[async_trait]
impl AgentCapability for LlmAgent {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn execute(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<JsonValue, AgentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Agent call cancelled");
                Err(AgentError::cancelled())
            }
            reply = self.client.complete(Some(&self.system_prompt), prompt) => {
                Ok(to_payload(&reply?))
            }
        }
    }
}

/// Structured payload for a model reply
///
/// An embedded JSON object is returned as-is; anything else becomes
/// `{"answer": <text>}`.
pub fn to_payload(reply: &str) -> JsonValue {
    JSON_OBJECT
        .find(reply)
        .and_then(|m| serde_json::from_str::<JsonValue>(m.as_str()).ok())
        .filter(JsonValue::is_object)
        .unwrap_or_else(|| json!({ "answer": reply.trim() }))
}
