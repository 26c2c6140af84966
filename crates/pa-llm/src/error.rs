//! Error types for pa-llm

use pa_core::AgentError;
use thiserror::Error;

/// Errors from talking to an LLM API
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("Could not parse LLM output: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse => true,
            Self::Json(_) | Self::Parse(_) | Self::Config(_) => false,
        }
    }
}

impl From<LlmError> for AgentError {
    fn from(e: LlmError) -> Self {
        AgentError::new(e.to_string(), e.is_retryable())
    }
}

impl From<LlmError> for pa_core::Error {
    fn from(e: LlmError) -> Self {
        pa_core::Error::Strategy(e.to_string())
    }
}

/// Result type alias for pa-llm
pub type Result<T> = std::result::Result<T, LlmError>;
