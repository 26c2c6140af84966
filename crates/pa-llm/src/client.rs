//! LLM API HTTP Client
//!
//! Supports both Claude API and OpenAI-compatible APIs (GLM, etc.)

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{LlmError, Result};
use crate::types::*;

/// Text-completion client for a single configured model
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
    max_tokens: u64,
    temperature: f32,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("provider", &self.provider)
            .finish()
    }
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.effective_base_url(),
            provider: config.provider,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Send one user prompt and return the reply text
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.map(str::to_string),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
        };

        let text = match self.provider {
            LlmProvider::Claude => self.send_claude_request(&request).await?,
            LlmProvider::OpenAi => self.send_openai_request(&request).await?,
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    /// Send request to Claude API
    async fn send_claude_request(&self, request: &MessagesRequest) -> Result<String> {
        let url = format!("{}/messages", self.base_url);

        debug!("Sending request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)?;

        info!(
            "Claude API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason, parsed.usage.output_tokens
        );

        Ok(parsed.text())
    }

    /// Send request to OpenAI-compatible API (GLM, etc.)
    async fn send_openai_request(&self, request: &MessagesRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to OpenAI-compatible API: {}", url);

        let openai_request = ChatCompletionRequest::from_claude_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;

        info!(
            "OpenAI API response: finish_reason={:?}, tokens={}",
            parsed.choices.first().and_then(|c| c.finish_reason.as_deref()),
            parsed.usage.completion_tokens
        );

        Ok(parsed.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claude_client, claude_server, claude_reply, openai_reply, request_count};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            api_key: "test_key".to_string(),
            provider,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_claude() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test_key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({"system": "be brief"})))
            .respond_with(claude_reply("hello there"))
            .expect(1)
            .mount(&server)
            .await;

        let text = claude_client(&server)
            .complete(Some("be brief"), "hi")
            .await
            .unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn test_complete_openai() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test_key"))
            .respond_with(openai_reply("hello there"))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url(&config(LlmProvider::OpenAi), server.uri()).unwrap();
        assert_eq!(client.provider(), LlmProvider::OpenAi);

        let text = client.complete(None, "hi").await.unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = claude_server(vec![
            ResponseTemplate::new(429).set_body_string(r#"{"error":"rate limited"}"#),
        ])
        .await;

        let err = claude_client(&server).complete(None, "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert!(err.is_retryable());
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let server = claude_server(vec![claude_reply("  ")]).await;

        let err = claude_client(&server).complete(None, "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = LlmClient::new(&config(LlmProvider::Claude)).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("test_key"));
        assert!(debug.contains("claude-sonnet-4-20250514"));
        assert_eq!(client.provider(), LlmProvider::Claude);
    }
}
