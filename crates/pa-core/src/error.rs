//! Error types for pa-core

use thiserror::Error;

use crate::orchestrator::AggregateReport;

/// Main error type for pa-core
///
/// Only run-fatal conditions live here. Per-subtask agent failures and
/// timeouts are recorded as [`crate::Outcome`] values and never surface
/// through this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Decomposition produced no usable subtasks")]
    DecompositionEmpty,

    #[error("Decomposition strategy failed: {0}")]
    Strategy(String),

    #[error("Duplicate subtask key: {0}")]
    DuplicateKey(String),

    #[error("Aggregation invoked before dispatch completed; missing keys: {missing:?}")]
    IncompleteAggregation {
        missing: Vec<String>,
        partial: Box<AggregateReport>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for pa-core
pub type Result<T> = std::result::Result<T, Error>;
