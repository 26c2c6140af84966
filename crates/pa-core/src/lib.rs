//! pa-core: Parallel Agents Core Library
//!
//! 自然言語のタスクを独立したサブタスクに分解し、エージェントで並列実行し、
//! 結果を順序どおりに集約するコア機能を提供します。

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::{Config, RunConfig};
pub use error::{Error, Result};
pub use orchestrator::{
    AgentCapability, AgentError, AggregateReport, Decomposer, DecompositionStrategy,
    DispatchConfig, DispatchSummary, Dispatcher, FixedStrategy, Orchestrator, Outcome,
    OutcomeStatus, ResultEntry, ResultStore, RunContext, SubtaskDescriptor, SubtaskDraft,
    SubtaskKey, Task, WholeTaskStrategy, aggregate,
};

// Cancellation token passed to agents
pub use tokio_util::sync::CancellationToken;
