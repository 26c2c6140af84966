//! Scripted agents shared by the orchestrator tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio_util::sync::CancellationToken;

use super::agent::{AgentCapability, AgentError};

/// What the scripted agent does for a prompt
#[derive(Clone)]
pub enum Behavior {
    /// Sleep, then return the payload
    Reply(Duration, JsonValue),
    /// Sleep, then fail
    Fail(Duration, AgentError),
    /// Never return, but stop when cancelled
    Hang,
    /// Never return and ignore cancellation
    HangStubborn,
    Panic,
}

/// Agent driven by a prompt → behavior table, counting concurrent calls
#[derive(Default)]
pub struct ScriptedAgent {
    script: HashMap<String, Behavior>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    pub dropped_while_running: Arc<AtomicBool>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, prompt: &str, behavior: Behavior) -> Self {
        self.script.insert(prompt.to_string(), behavior);
        self
    }

    /// Highest number of simultaneous executions observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Decrements the active counter even when the execution is aborted
struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
    finished: bool,
    dropped_while_running: Arc<AtomicBool>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if !self.finished {
            self.dropped_while_running.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AgentCapability for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<JsonValue, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let mut guard = ActiveGuard {
            active: &self.active,
            finished: false,
            dropped_while_running: self.dropped_while_running.clone(),
        };

        let behavior = self
            .script
            .get(prompt)
            .cloned()
            .unwrap_or(Behavior::Reply(Duration::from_millis(5), json!({ "prompt": prompt })));

        let result = match behavior {
            Behavior::Reply(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
            Behavior::Fail(delay, error) => {
                tokio::time::sleep(delay).await;
                Err(error)
            }
            Behavior::Hang => {
                cancel.cancelled().await;
                Err(AgentError::cancelled())
            }
            Behavior::HangStubborn => std::future::pending().await,
            Behavior::Panic => panic!("scripted panic"),
        };

        guard.finished = true;
        result
    }
}
