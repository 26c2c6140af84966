//! Orchestrator data model
//!
//! - Task: the caller's natural-language request
//! - SubtaskDescriptor: one independent unit produced by decomposition
//! - Outcome / ResultEntry: what a worker recorded for a subtask
//! - AggregateReport: the ordered, final view of one run

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Natural-language task submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task(String);

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the task has any content once whitespace is trimmed
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Task {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Unique, human-readable key of a subtask within one run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskKey(pub String);

impl SubtaskKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubtaskKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SubtaskKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// One independently executable subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskDescriptor {
    /// Unique key within the run
    pub key: SubtaskKey,
    /// Non-empty prompt handed to the agent
    pub prompt: String,
    /// Position in decomposition order
    pub order: usize,
}

impl SubtaskDescriptor {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>, order: usize) -> Self {
        Self {
            key: SubtaskKey::new(key),
            prompt: prompt.into(),
            order,
        }
    }
}

/// Result of executing one subtask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { payload: JsonValue },
    Failure { reason: String, retryable: bool },
    Timeout,
}

impl Outcome {
    pub fn success(payload: JsonValue) -> Self {
        Self::Success { payload }
    }

    pub fn failure(reason: impl Into<String>, retryable: bool) -> Self {
        Self::Failure {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Only agent failures flagged as retryable qualify; timeouts do not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failure { retryable: true, .. })
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Success { .. } => OutcomeStatus::Succeeded,
            Self::Failure { .. } => OutcomeStatus::Failed,
            Self::Timeout => OutcomeStatus::TimedOut,
        }
    }

    /// Payload of a successful outcome
    pub fn payload(&self) -> Option<&JsonValue> {
        match self {
            Self::Success { payload } => Some(payload),
            _ => None,
        }
    }
}

/// Machine-readable status of a subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// An outcome as stored, with its execution window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub key: SubtaskKey,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ResultEntry {
    pub fn new(
        key: SubtaskKey,
        outcome: Outcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            outcome,
            started_at,
            finished_at,
        }
    }

    /// Wall-clock time between start and finish
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Final, order-preserving summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// The task this run answered
    pub task: Task,
    /// One entry per subtask, in decomposition order
    pub entries: Vec<ResultEntry>,
    pub succeeded_count: usize,
    /// Failures and timeouts
    pub failed_count: usize,
}

impl AggregateReport {
    /// Build a report from entries already in decomposition order
    pub fn from_entries(task: Task, entries: Vec<ResultEntry>) -> Self {
        let succeeded_count = entries.iter().filter(|e| e.outcome.is_success()).count();
        let failed_count = entries.len() - succeeded_count;

        Self {
            task,
            entries,
            succeeded_count,
            failed_count,
        }
    }

    /// Status per subtask key
    pub fn statuses(&self) -> BTreeMap<&str, OutcomeStatus> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.outcome.status()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&ResultEntry> {
        self.entries.iter().find(|e| e.key.as_str() == key)
    }

    /// True when every subtask succeeded
    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{}/{} subtasks succeeded, {} failed",
            self.succeeded_count,
            self.entries.len(),
            self.failed_count
        )
    }
}
