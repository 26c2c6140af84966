//! LLM-backed decomposition strategy

use std::sync::LazyLock;

use async_trait::async_trait;
use pa_core::{DecompositionStrategy, SubtaskDraft};
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::client::LlmClient;
use crate::error::{LlmError, Result};

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("JSON array pattern is valid"));

const SYSTEM_PROMPT: &str = "You are a task decomposition expert. You break a task into \
independent subtasks that can be executed in parallel.";

/// Asks a model to split the task, falling back to the whole task
///
/// Non-retryable API errors (bad key, bad request) are returned as
/// [`pa_core::Error::Strategy`] instead of falling back.
pub struct LlmDecomposer {
    client: LlmClient,
    attempts: usize,
}

impl LlmDecomposer {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            attempts: 2,
        }
    }

    /// Number of model calls before falling back (at least 1)
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

#[async_trait]
impl DecompositionStrategy for LlmDecomposer {
    async fn split(&self, task: &str, max_subtasks: usize) -> pa_core::Result<Vec<SubtaskDraft>> {
        let prompt = split_prompt(task, max_subtasks);

        for attempt in 1..=self.attempts {
            let reply = match self.client.complete(Some(SYSTEM_PROMPT), &prompt).await {
                Ok(reply) => reply,
                Err(e) if !e.is_retryable() => {
                    error!("Task splitting failed: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Task splitting attempt {} failed: {}", attempt, e);
                    continue;
                }
            };

            match parse_subtasks(&reply) {
                Ok(drafts) if !drafts.is_empty() => {
                    info!("Model split task into {} subtasks", drafts.len());
                    return Ok(drafts);
                }
                Ok(_) => warn!("Task splitting attempt {} returned no subtasks", attempt),
                Err(e) => warn!("Task splitting attempt {} unparseable: {}", attempt, e),
            }
        }

        warn!("Falling back to the whole task as a single subtask");
        Ok(vec![SubtaskDraft::unkeyed(task.trim())])
    }
}

fn split_prompt(task: &str, max_subtasks: usize) -> String {
    format!(
        r#"Break the following task into at most {max_subtasks} independent subtasks.

Task: {task}

Rules:
1. Each subtask must be completely independent and runnable in parallel
2. Each subtask must be a specific, self-contained task description
3. If the task involves several people, companies or items, create one subtask per item
4. Give each subtask a short unique key naming what it produces (e.g. "age_of_alice")
5. Return ONLY a JSON array, no other text

Format:
[{{"key": "...", "prompt": "..."}}]"#
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DraftItem {
    Text(String),
    Keyed {
        #[serde(default)]
        key: Option<String>,
        prompt: String,
    },
}

/// Extract subtask drafts from a model reply
///
/// Accepts a JSON array of strings or of `{key, prompt}` objects, optionally
/// surrounded by prose or code fences.
pub fn parse_subtasks(reply: &str) -> Result<Vec<SubtaskDraft>> {
    let candidate = JSON_ARRAY
        .find(reply)
        .map(|m| m.as_str())
        .unwrap_or(reply.trim());

    let items: Vec<DraftItem> = serde_json::from_str(candidate)
        .map_err(|e| LlmError::Parse(format!("expected a JSON array of subtasks: {}", e)))?;

    Ok(items
        .into_iter()
        .map(|item| match item {
            DraftItem::Text(prompt) => SubtaskDraft::unkeyed(prompt),
            DraftItem::Keyed { key, prompt } => SubtaskDraft { key, prompt },
        })
        .collect())
}
