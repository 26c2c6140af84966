//! pa-llm: LLM adapters for pa-core
//!
//! Claude API / OpenAI 互換 API を使って、タスク分解戦略
//! ([`LlmDecomposer`]) とサブタスク実行エージェント ([`LlmAgent`]) を提供します。

pub mod agent;
pub mod client;
pub mod config;
pub mod decomposer;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{LlmAgent, to_payload};
pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use decomposer::{LlmDecomposer, parse_subtasks};
pub use error::{LlmError, Result};

use std::sync::Arc;

use pa_core::{Config, Orchestrator};

/// Build an orchestrator whose decomposer and agent share one model client
pub fn orchestrator_from_config(config: &Config) -> Result<Orchestrator> {
    let llm = LlmConfig::from_config(config)?;
    let client = LlmClient::new(&llm)?;

    Ok(Orchestrator::new(
        Arc::new(LlmDecomposer::new(client.clone())),
        Arc::new(LlmAgent::new(client)),
    ))
}
