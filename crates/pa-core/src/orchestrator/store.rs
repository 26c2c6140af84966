//! Shared result store
//!
//! Write-once, concurrency-safe storage of subtask outcomes. Workers write
//! into it while the dispatcher is running; the aggregator reads a snapshot
//! once dispatch has returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, error};

use super::types::{Outcome, ResultEntry, SubtaskKey};
use crate::{Error, Result};

/// Per-run store of subtask results
///
/// Cloning yields another handle to the same storage.
#[derive(Clone, Default)]
pub struct ResultStore {
    entries: Arc<DashMap<SubtaskKey, ResultEntry>>,
}

impl ResultStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Record an outcome that started and finished now
    pub fn put(&self, key: impl Into<SubtaskKey>, outcome: Outcome) -> Result<()> {
        let now = Utc::now();
        self.insert_entry(ResultEntry::new(key.into(), outcome, now, now))
    }

    /// Record an outcome for an execution that began at `started_at`
    pub fn record(
        &self,
        key: impl Into<SubtaskKey>,
        outcome: Outcome,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        self.insert_entry(ResultEntry::new(key.into(), outcome, started_at, Utc::now()))
    }

    /// Insert a complete entry. Fails if the key was already written.
    pub fn insert_entry(&self, entry: ResultEntry) -> Result<()> {
        match self.entries.entry(entry.key.clone()) {
            Entry::Occupied(existing) => {
                error!(
                    "Rejected second write for subtask key: {}",
                    existing.key().as_str()
                );
                Err(Error::DuplicateKey(existing.key().to_string()))
            }
            Entry::Vacant(slot) => {
                debug!(
                    "Stored {} outcome for subtask: {}",
                    entry.outcome.status().as_str(),
                    entry.key.as_str()
                );
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Owned copy of every entry written so far, ordered by key
    pub fn snapshot(&self) -> BTreeMap<SubtaskKey, ResultEntry> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Get a single entry
    pub fn get(&self, key: &SubtaskKey) -> Option<ResultEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Check whether a key has been written
    pub fn has(&self, key: &SubtaskKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries written
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_and_get() {
        let store = ResultStore::new();
        store.put("a", Outcome::success(json!({"age": 52}))).unwrap();

        assert_eq!(store.size(), 1);
        assert!(store.has(&SubtaskKey::new("a")));
        assert!(!store.has(&SubtaskKey::new("b")));

        let entry = store.get(&SubtaskKey::new("a")).unwrap();
        assert_eq!(entry.outcome.payload(), Some(&json!({"age": 52})));
    }

    #[test]
    fn test_duplicate_put_rejected_and_first_kept() {
        let store = ResultStore::new();
        store.put("a", Outcome::success(json!("first"))).unwrap();

        let result = store.put("a", Outcome::failure("second", false));
        assert!(matches!(result, Err(Error::DuplicateKey(ref k)) if k == "a"));

        let entry = store.get(&SubtaskKey::new("a")).unwrap();
        assert_eq!(entry.outcome, Outcome::success(json!("first")));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_record_keeps_start_time() {
        let store = ResultStore::new();
        let started = Utc::now() - chrono::Duration::milliseconds(250);
        store.record("slow", Outcome::Timeout, started).unwrap();

        let entry = store.get(&SubtaskKey::new("slow")).unwrap();
        assert_eq!(entry.started_at, started);
        assert!(entry.elapsed() >= chrono::Duration::milliseconds(250));
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let store = ResultStore::new();
        store.put("a", Outcome::Timeout).unwrap();

        let snapshot = store.snapshot();
        store.put("b", Outcome::Timeout).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_clone_shares_storage() {
        let store = ResultStore::new();
        let handle = store.clone();
        handle.put("a", Outcome::Timeout).unwrap();
        assert!(store.has(&SubtaskKey::new("a")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_single_winner() {
        let store = ResultStore::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                // Every writer targets one of four keys
                let key = format!("k{}", i % 4);
                store.put(key.as_str(), Outcome::success(json!(i))).is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 4);
        assert_eq!(store.size(), 4);
    }
}
