//! Configuration management
//!
//! 設定は TOML ファイルから読み込まれます。未指定の項目はデフォルト値になります。
//!
//! ```toml
//! [orchestrator]
//! max_subtasks = 10
//! concurrency_limit = 5
//! per_task_timeout_ms = 300000
//!
//! [llm]
//! provider = "claude"
//! ```
//!
//! The `[llm]` table is kept as raw TOML here and interpreted by the adapter
//! crate that needs it.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::DispatchConfig;
use crate::{Error, Result};

/// Per-run orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Upper bound on subtasks produced by decomposition
    #[serde(default = "default_max_subtasks")]
    pub max_subtasks: usize,

    /// Maximum concurrently running agent executions
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Time budget for one subtask, in milliseconds
    #[serde(default = "default_per_task_timeout_ms")]
    pub per_task_timeout_ms: u64,

    /// Grace period for a timed-out agent to stop, in milliseconds
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,

    /// Extra dispatch rounds for retryable failures
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_subtasks: default_max_subtasks(),
            concurrency_limit: default_concurrency_limit(),
            per_task_timeout_ms: default_per_task_timeout_ms(),
            cancel_grace_ms: default_cancel_grace_ms(),
            max_retries: 0,
        }
    }
}

fn default_max_subtasks() -> usize {
    10
}

fn default_concurrency_limit() -> usize {
    5
}

fn default_per_task_timeout_ms() -> u64 {
    300_000
}

fn default_cancel_grace_ms() -> u64 {
    50
}

impl RunConfig {
    pub fn with_max_subtasks(mut self, max_subtasks: usize) -> Self {
        self.max_subtasks = max_subtasks;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_per_task_timeout(mut self, timeout: Duration) -> Self {
        self.per_task_timeout_ms = ceil_millis(timeout);
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace_ms = ceil_millis(grace);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn per_task_timeout(&self) -> Duration {
        Duration::from_millis(self.per_task_timeout_ms)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Dispatcher settings derived from this configuration
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            concurrency_limit: self.concurrency_limit,
            per_task_timeout: self.per_task_timeout(),
            cancel_grace: self.cancel_grace(),
        }
    }

    /// Reject settings no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.max_subtasks == 0 {
            return Err(Error::InvalidConfig("max_subtasks must be at least 1".to_string()));
        }
        if self.concurrency_limit == 0 {
            return Err(Error::InvalidConfig(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.per_task_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "per_task_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Orchestration settings
    #[serde(default)]
    pub orchestrator: RunConfig,

    /// Adapter settings, parsed by the crate that owns them
    #[serde(default)]
    pub llm: Option<toml::Value>,
}

impl Config {
    /// TOML 文字列から設定を読み込む
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    /// TOML 設定ファイルから設定を読み込む
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

/// Milliseconds, rounded up so a non-zero duration never becomes zero
fn ceil_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}
