//! LLM adapter configuration
//!
//! Read from the `[llm]` table of the configuration file.

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// LLM Provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude API
    #[default]
    Claude,
    /// OpenAI-compatible API (GLM, etc.)
    #[serde(alias = "glm", alias = "zai", alias = "minimax")]
    OpenAi,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API provider
    #[serde(default)]
    pub provider: LlmProvider,

    /// Base URL (optional, for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::Claude,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_temperature() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl LlmConfig {
    /// Read the `[llm]` table of a loaded configuration file
    pub fn from_config(config: &pa_core::Config) -> Result<Self> {
        let table: toml::Value = config
            .llm
            .clone()
            .ok_or_else(|| LlmError::Config("missing [llm] section".to_string()))?;

        let llm: LlmConfig = table
            .try_into()
            .map_err(|e| LlmError::Config(format!("invalid [llm] section: {}", e)))?;

        if llm.api_key.is_empty() {
            return Err(LlmError::Config("llm.api_key is empty".to_string()));
        }
        Ok(llm)
    }

    /// Endpoint root for the configured provider
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
            },
        }
    }
}
