//! Task decomposition
//!
//! A [`DecompositionStrategy`] proposes subtasks for a task; the
//! [`Decomposer`] validates and sanitizes whatever it proposes into an
//! ordered list of [`SubtaskDescriptor`]s.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::types::{SubtaskDescriptor, SubtaskKey, Task};
use crate::{Error, Result};

/// Unvalidated subtask proposed by a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskDraft {
    /// Key to store the result under; derived from the prompt when absent
    #[serde(default)]
    pub key: Option<String>,
    pub prompt: String,
}

impl SubtaskDraft {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            prompt: prompt.into(),
        }
    }

    /// Draft without an explicit key
    pub fn unkeyed(prompt: impl Into<String>) -> Self {
        Self {
            key: None,
            prompt: prompt.into(),
        }
    }
}

/// Splits a task into independent subtask drafts
#[async_trait]
pub trait DecompositionStrategy: Send + Sync {
    /// Propose at most `max_subtasks` drafts for `task`
    async fn split(&self, task: &str, max_subtasks: usize) -> Result<Vec<SubtaskDraft>>;
}

/// Strategy returning a preconfigured list of drafts
#[derive(Debug, Clone, Default)]
pub struct FixedStrategy {
    drafts: Vec<SubtaskDraft>,
}

impl FixedStrategy {
    pub fn new(drafts: Vec<SubtaskDraft>) -> Self {
        Self { drafts }
    }

    /// Build from `(key, prompt)` pairs
    pub fn from_pairs<K, P>(pairs: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, p)| SubtaskDraft::new(k, p))
                .collect(),
        )
    }
}

#[async_trait]
impl DecompositionStrategy for FixedStrategy {
    async fn split(&self, _task: &str, _max_subtasks: usize) -> Result<Vec<SubtaskDraft>> {
        Ok(self.drafts.clone())
    }
}

/// Strategy that keeps the task as its only subtask
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeTaskStrategy;

#[async_trait]
impl DecompositionStrategy for WholeTaskStrategy {
    async fn split(&self, task: &str, _max_subtasks: usize) -> Result<Vec<SubtaskDraft>> {
        Ok(vec![SubtaskDraft::unkeyed(task.trim())])
    }
}

/// Stable key for a prompt: `Task_` followed by 8 hex chars of its SHA-256
pub fn derive_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    format!("Task_{}", &hex::encode(digest)[..8])
}

/// Validates strategy output into subtask descriptors
pub struct Decomposer<'a> {
    strategy: &'a dyn DecompositionStrategy,
}

impl<'a> Decomposer<'a> {
    pub fn new(strategy: &'a dyn DecompositionStrategy) -> Self {
        Self { strategy }
    }

    /// Decompose `task` into between 1 and `max_subtasks` descriptors
    pub async fn decompose(
        &self,
        task: &Task,
        max_subtasks: usize,
    ) -> Result<Vec<SubtaskDescriptor>> {
        if task.is_blank() {
            return Err(Error::InvalidTask("task is empty".to_string()));
        }
        if max_subtasks == 0 {
            return Err(Error::InvalidConfig(
                "max_subtasks must be at least 1".to_string(),
            ));
        }

        let drafts = self.strategy.split(task.as_str(), max_subtasks).await?;
        let proposed = drafts.len();
        let subtasks = sanitize(drafts, max_subtasks);

        if subtasks.is_empty() {
            warn!("Strategy proposed {} drafts, none usable", proposed);
            return Err(Error::DecompositionEmpty);
        }

        info!(
            "Decomposed task into {} subtasks ({} proposed)",
            subtasks.len(),
            proposed
        );
        Ok(subtasks)
    }
}

/// Drop empty prompts, fill in missing keys, keep the first draft per key,
/// then cap the list at `max_subtasks`
fn sanitize(drafts: Vec<SubtaskDraft>, max_subtasks: usize) -> Vec<SubtaskDescriptor> {
    let mut seen = HashSet::new();
    let mut subtasks = Vec::new();

    for draft in drafts {
        let prompt = draft.prompt.trim();
        if prompt.is_empty() {
            debug!("Dropping draft with empty prompt");
            continue;
        }

        let key = match draft.key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => derive_key(prompt),
        };

        if !seen.insert(key.clone()) {
            debug!("Dropping duplicate subtask key: {}", key);
            continue;
        }

        if subtasks.len() == max_subtasks {
            warn!("Discarding subtasks beyond the limit of {}", max_subtasks);
            break;
        }

        subtasks.push(SubtaskDescriptor {
            key: SubtaskKey::new(key),
            prompt: prompt.to_string(),
            order: subtasks.len(),
        });
    }

    subtasks
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStrategy;

    #[async_trait]
    impl DecompositionStrategy for FailingStrategy {
        async fn split(&self, _task: &str, _max: usize) -> Result<Vec<SubtaskDraft>> {
            Err(Error::Strategy("model unavailable".to_string()))
        }
    }

    fn keys(subtasks: &[SubtaskDescriptor]) -> Vec<&str> {
        subtasks.iter().map(|s| s.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_decompose_keeps_strategy_order() {
        let strategy = FixedStrategy::from_pairs([("A", "age of A"), ("B", "age of B")]);
        let subtasks = Decomposer::new(&strategy)
            .decompose(&Task::new("Find the ages of A and B"), 5)
            .await
            .unwrap();

        assert_eq!(keys(&subtasks), vec!["A", "B"]);
        assert_eq!(subtasks[0].prompt, "age of A");
        assert_eq!(subtasks[1].order, 1);
    }

    #[tokio::test]
    async fn test_decompose_rejects_blank_task() {
        let strategy = WholeTaskStrategy;
        let result = Decomposer::new(&strategy).decompose(&Task::new("  \n "), 3).await;
        assert!(matches!(result, Err(Error::InvalidTask(_))));
    }

    #[tokio::test]
    async fn test_decompose_rejects_zero_limit() {
        let strategy = WholeTaskStrategy;
        let result = Decomposer::new(&strategy).decompose(&Task::new("task"), 0).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_decompose_dedups_first_wins_and_drops_empty() {
        let strategy = FixedStrategy::new(vec![
            SubtaskDraft::new("A", "first A"),
            SubtaskDraft::new("B", "   "),
            SubtaskDraft::new("A", "second A"),
            SubtaskDraft::new("C", " prompt C "),
        ]);
        let subtasks = Decomposer::new(&strategy)
            .decompose(&Task::new("t"), 10)
            .await
            .unwrap();

        assert_eq!(keys(&subtasks), vec!["A", "C"]);
        assert_eq!(subtasks[0].prompt, "first A");
        assert_eq!(subtasks[1].prompt, "prompt C");
        assert_eq!(subtasks[1].order, 1);
    }

    #[tokio::test]
    async fn test_decompose_truncates_to_limit() {
        let strategy = FixedStrategy::from_pairs((0..6).map(|i| (format!("k{i}"), format!("p{i}"))));
        let subtasks = Decomposer::new(&strategy)
            .decompose(&Task::new("t"), 4)
            .await
            .unwrap();

        assert_eq!(keys(&subtasks), vec!["k0", "k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn test_decompose_all_empty_fails() {
        let strategy = FixedStrategy::new(vec![SubtaskDraft::new("A", ""), SubtaskDraft::unkeyed(" ")]);
        let result = Decomposer::new(&strategy).decompose(&Task::new("t"), 3).await;
        assert!(matches!(result, Err(Error::DecompositionEmpty)));
    }

    #[tokio::test]
    async fn test_decompose_propagates_strategy_error() {
        let result = Decomposer::new(&FailingStrategy)
            .decompose(&Task::new("t"), 3)
            .await;
        assert!(matches!(result, Err(Error::Strategy(_))));
    }

    #[tokio::test]
    async fn test_unkeyed_drafts_get_derived_keys() {
        let strategy = FixedStrategy::new(vec![
            SubtaskDraft::unkeyed("Find the age of A"),
            SubtaskDraft::unkeyed("Find the age of A"),
            SubtaskDraft::new("  ", "Find the age of B"),
        ]);
        let subtasks = Decomposer::new(&strategy)
            .decompose(&Task::new("t"), 5)
            .await
            .unwrap();

        assert_eq!(subtasks.len(), 2);
        assert_eq!(subtasks[0].key.as_str(), derive_key("Find the age of A"));
        assert_eq!(subtasks[1].key.as_str(), derive_key("Find the age of B"));
    }

    #[test]
    fn test_whole_task_strategy() {
        let subtasks = tokio_test::block_on(
            Decomposer::new(&WholeTaskStrategy).decompose(&Task::new("  Find the age of A "), 5),
        )
        .unwrap();

        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].prompt, "Find the age of A");
    }

    #[test]
    fn test_derive_key_is_stable() {
        let key = derive_key("hello");
        // sha256("hello") = 2cf24dba...
        assert_eq!(key, "Task_2cf24dba");
        assert_eq!(derive_key("hello"), key);
        assert_ne!(derive_key("hello!"), key);
    }
}
