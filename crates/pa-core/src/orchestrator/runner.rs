//! Caller-facing run API
//!
//! Composes decomposition, dispatch and aggregation for one task, with an
//! optional retry of retryable failures.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::agent::AgentCapability;
use super::aggregator::aggregate;
use super::decomposer::{Decomposer, DecompositionStrategy};
use super::dispatcher::Dispatcher;
use super::store::ResultStore;
use super::types::{AggregateReport, ResultEntry, SubtaskDescriptor, SubtaskKey, Task};
use crate::Result;
use crate::config::RunConfig;

/// State owned by one run and discarded when it ends
pub struct RunContext {
    pub run_id: Uuid,
    pub config: RunConfig,
    pub store: ResultStore,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(config: RunConfig, cancel: CancellationToken) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            config,
            store: ResultStore::new(),
            cancel,
        }
    }
}

/// Runs tasks end to end against a strategy and an agent
pub struct Orchestrator {
    strategy: Arc<dyn DecompositionStrategy>,
    agent: Arc<dyn AgentCapability>,
}

impl Orchestrator {
    pub fn new(
        strategy: Arc<dyn DecompositionStrategy>,
        agent: Arc<dyn AgentCapability>,
    ) -> Self {
        Self { strategy, agent }
    }

    /// Run `task` to completion
    pub async fn run(&self, task: &Task, config: &RunConfig) -> Result<AggregateReport> {
        self.run_with_cancel(task, config, CancellationToken::new())
            .await
    }

    /// Run `task`, stopping early when `cancel` fires
    ///
    /// A cancelled run still returns a full report; subtasks that did not
    /// finish are recorded as retryable failures.
    pub async fn run_with_cancel(
        &self,
        task: &Task,
        config: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<AggregateReport> {
        config.validate()?;
        let ctx = RunContext::new(config.clone(), cancel);
        let span = info_span!("run", run_id = %ctx.run_id);

        self.run_in_context(task, ctx).instrument(span).await
    }

    async fn run_in_context(&self, task: &Task, ctx: RunContext) -> Result<AggregateReport> {
        info!("Starting run for task: {}", task);

        let subtasks = Decomposer::new(self.strategy.as_ref())
            .decompose(task, ctx.config.max_subtasks)
            .await?;

        let dispatcher = Dispatcher::new(ctx.config.dispatch_config());
        dispatcher
            .dispatch(&subtasks, self.agent.clone(), &ctx.store, &ctx.cancel)
            .await?;

        let store = if ctx.config.max_retries > 0 {
            self.retry_rounds(&subtasks, &dispatcher, &ctx).await?
        } else {
            ctx.store.clone()
        };

        let report = aggregate(task, &subtasks, &store)?;
        info!("Run finished: {}", report.summary());
        Ok(report)
    }

    /// Re-dispatch retryable failures into fresh stores and merge the
    /// latest entry per key into a final store
    async fn retry_rounds(
        &self,
        subtasks: &[SubtaskDescriptor],
        dispatcher: &Dispatcher,
        ctx: &RunContext,
    ) -> Result<ResultStore> {
        let mut latest: HashMap<SubtaskKey, ResultEntry> = ctx.store.snapshot().into_iter().collect();

        for round in 1..=ctx.config.max_retries {
            if ctx.cancel.is_cancelled() {
                break;
            }

            let retry: Vec<SubtaskDescriptor> = subtasks
                .iter()
                .filter(|s| latest.get(&s.key).is_some_and(|e| e.outcome.is_retryable()))
                .cloned()
                .collect();

            if retry.is_empty() {
                break;
            }

            warn!(
                "Retrying {} subtasks (round {}/{})",
                retry.len(),
                round,
                ctx.config.max_retries
            );

            let round_store = ResultStore::new();
            dispatcher
                .dispatch(&retry, self.agent.clone(), &round_store, &ctx.cancel)
                .await?;
            latest.extend(round_store.snapshot());
        }

        let merged = ResultStore::new();
        for subtask in subtasks {
            if let Some(entry) = latest.remove(&subtask.key) {
                merged.insert_entry(entry)?;
            }
        }
        Ok(merged)
    }
}
