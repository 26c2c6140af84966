//! Worker dispatcher
//!
//! Runs one execution unit per subtask with a fixed number of slots, records
//! exactly one outcome per subtask in the [`ResultStore`], and returns once
//! every subtask has reached a terminal state.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::agent::{AgentCapability, AgentError};
use super::store::ResultStore;
use super::types::{Outcome, OutcomeStatus, SubtaskDescriptor, SubtaskKey};
use crate::config::RunConfig;
use crate::{Error, Result};

const CANCELLED_REASON: &str = "cancelled";

/// Configuration for one dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Maximum concurrently running agent executions
    pub concurrency_limit: usize,
    /// Time budget for one agent execution
    pub per_task_timeout: Duration,
    /// How long a timed-out execution may take to wind down before it is aborted
    pub cancel_grace: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        RunConfig::default().dispatch_config()
    }
}

impl DispatchConfig {
    fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(Error::InvalidConfig(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.per_task_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "per_task_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counts of what one dispatch recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed: Duration,
}

impl DispatchSummary {
    fn tally(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::TimedOut => self.timed_out += 1,
        }
    }
}

/// What an execution unit reports back to the join loop
struct UnitReport {
    key: SubtaskKey,
    status: OutcomeStatus,
    recorded: Result<()>,
}

/// Bounded-concurrency executor of subtasks
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Execute every subtask against `agent`, writing outcomes into `store`
    ///
    /// Agent failures and timeouts are recorded, never returned. Errors are
    /// reserved for invalid configuration and write-once violations.
    pub async fn dispatch(
        &self,
        subtasks: &[SubtaskDescriptor],
        agent: Arc<dyn AgentCapability>,
        store: &ResultStore,
        cancel: &CancellationToken,
    ) -> Result<DispatchSummary> {
        self.config.validate()?;
        check_keys(subtasks, store)?;

        let start_time = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit));
        let mut join_set = JoinSet::new();
        let mut summary = DispatchSummary {
            dispatched: subtasks.len(),
            ..Default::default()
        };
        let mut first_error: Option<Error> = None;

        info!(
            "Dispatching {} subtasks to {} (limit {}, timeout {:?})",
            subtasks.len(),
            agent.name(),
            self.config.concurrency_limit,
            self.config.per_task_timeout
        );

        for (index, subtask) in subtasks.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => Some(
                    permit.map_err(|e| Error::Internal(format!("slot pool closed: {}", e)))?,
                ),
            };

            let Some(permit) = permit else {
                warn!(
                    "Dispatch cancelled, {} subtasks never started",
                    subtasks.len() - index
                );
                for pending in &subtasks[index..] {
                    let recorded = store.put(
                        pending.key.clone(),
                        Outcome::failure(CANCELLED_REASON, true),
                    );
                    summary.tally(OutcomeStatus::Failed);
                    if let Err(e) = recorded {
                        first_error.get_or_insert(e);
                    }
                }
                break;
            };

            let unit = ExecutionUnit {
                subtask: subtask.clone(),
                agent: agent.clone(),
                store: store.clone(),
                config: self.config,
                cancel: cancel.child_token(),
            };

            join_set.spawn(async move {
                let report = unit.run().await;
                drop(permit);
                report
            });
        }

        // Join barrier: every spawned unit has recorded its outcome
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => {
                    summary.tally(report.status);
                    if let Err(e) = report.recorded {
                        error!("Failed to record outcome for {}: {}", report.key, e);
                        first_error.get_or_insert(e);
                    }
                }
                Err(e) => error!("Execution unit terminated abnormally: {}", e),
            }
        }

        // Units that died before writing still owe an entry
        for subtask in subtasks {
            if !store.has(&subtask.key) {
                error!("No outcome recorded for {}, marking failed", subtask.key);
                let recorded = store.put(
                    subtask.key.clone(),
                    Outcome::failure("execution unit terminated unexpectedly", false),
                );
                summary.tally(OutcomeStatus::Failed);
                if let Err(e) = recorded {
                    first_error.get_or_insert(e);
                }
            }
        }

        summary.elapsed = start_time.elapsed();
        info!(
            "Dispatch finished in {:?}: {} succeeded, {} failed, {} timed out",
            summary.elapsed, summary.succeeded, summary.failed, summary.timed_out
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// Keys must be unique within the batch and not yet present in the store
fn check_keys(subtasks: &[SubtaskDescriptor], store: &ResultStore) -> Result<()> {
    let mut seen = HashSet::new();
    for subtask in subtasks {
        if !seen.insert(&subtask.key) || store.has(&subtask.key) {
            return Err(Error::DuplicateKey(subtask.key.to_string()));
        }
    }
    Ok(())
}

/// One subtask execution, owning everything it touches
struct ExecutionUnit {
    subtask: SubtaskDescriptor,
    agent: Arc<dyn AgentCapability>,
    store: ResultStore,
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl ExecutionUnit {
    async fn run(self) -> UnitReport {
        let key = self.subtask.key.clone();
        let started_at = Utc::now();
        let clock = Instant::now();
        debug!("Subtask {} started", key);

        let agent = self.agent.clone();
        let prompt = self.subtask.prompt.clone();
        let agent_cancel = self.cancel.clone();
        let mut handle: JoinHandle<std::result::Result<serde_json::Value, AgentError>> =
            tokio::spawn(async move { agent.execute(&prompt, agent_cancel).await });

        let outcome = tokio::select! {
            joined = tokio::time::timeout(self.config.per_task_timeout, &mut handle) => match joined {
                Ok(Ok(Ok(payload))) => Outcome::success(payload),
                Ok(Ok(Err(e))) => {
                    warn!("Subtask {} failed: {}", key, e.reason);
                    Outcome::failure(e.reason, e.retryable)
                }
                Ok(Err(e)) => {
                    error!("Agent execution for {} panicked: {}", key, e);
                    Outcome::failure(format!("agent panicked: {}", e), false)
                }
                Err(_) => {
                    warn!(
                        "Subtask {} timed out after {:?}",
                        key, self.config.per_task_timeout
                    );
                    Outcome::Timeout
                }
            },
            _ = self.cancel.cancelled() => {
                warn!("Subtask {} cancelled", key);
                Outcome::failure(CANCELLED_REASON, true)
            }
        };

        let status = outcome.status();
        let recorded = self.store.record(key.clone(), outcome, started_at);
        debug!(
            "Subtask {} finished as {} in {:?}",
            key,
            status.as_str(),
            clock.elapsed()
        );

        if !handle.is_finished() {
            self.cancel.cancel();
            self.wind_down(&key, handle).await;
        }

        UnitReport {
            key,
            status,
            recorded,
        }
    }

    /// Give a cancelled execution the grace period, then abort it
    ///
    /// Returns only once the agent future has been dropped, so the slot is
    /// free when the permit is released.
    async fn wind_down<T>(&self, key: &SubtaskKey, mut handle: JoinHandle<T>) {
        if tokio::time::timeout(self.config.cancel_grace, &mut handle)
            .await
            .is_err()
        {
            warn!(
                "Agent for {} ignored cancellation for {:?}, aborting",
                key, self.config.cancel_grace
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}
