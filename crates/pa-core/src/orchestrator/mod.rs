//! Parallel task orchestration
//!
//! ## Architecture
//!
//! ```text
//!            Task
//!             │
//!             ▼
//! ┌───────────────────────┐
//! │      Decomposer       │  strategy output → validated subtasks
//! └───────────┬───────────┘
//!             │ SubtaskDescriptor × N
//!             ▼
//! ┌───────────────────────┐
//! │      Dispatcher       │  N units, at most `concurrency_limit` running
//! │ ┌──────┐ ┌──────┐     │  each: agent.execute() under a timeout
//! │ │unit 1│ │unit 2│ ... │
//! │ └──┬───┘ └──┬───┘     │
//! └────┼────────┼─────────┘
//!      ▼        ▼
//! ┌───────────────────────┐
//! │      ResultStore      │  write-once per key
//! └───────────┬───────────┘
//!             │ snapshot
//!             ▼
//! ┌───────────────────────┐
//! │      aggregate()      │  decomposition order, success/failure counts
//! └───────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pa_core::{FixedStrategy, Orchestrator, RunConfig, Task};
//! use std::sync::Arc;
//!
//! let strategy = Arc::new(FixedStrategy::from_pairs([
//!     ("A", "Find the age of A"),
//!     ("B", "Find the age of B"),
//! ]));
//! let orchestrator = Orchestrator::new(strategy, Arc::new(my_agent));
//!
//! let report = orchestrator
//!     .run(&Task::new("Find the ages of A and B"), &RunConfig::default())
//!     .await?;
//! println!("{}", report.summary());
//! ```

pub mod agent;
pub mod aggregator;
pub mod decomposer;
pub mod dispatcher;
pub mod runner;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use agent::{AgentCapability, AgentError};
pub use aggregator::aggregate;
pub use decomposer::{
    Decomposer, DecompositionStrategy, FixedStrategy, SubtaskDraft, WholeTaskStrategy, derive_key,
};
pub use dispatcher::{DispatchConfig, DispatchSummary, Dispatcher};
pub use runner::{Orchestrator, RunContext};
pub use store::ResultStore;
pub use types::{
    AggregateReport, Outcome, OutcomeStatus, ResultEntry, SubtaskDescriptor, SubtaskKey, Task,
};
