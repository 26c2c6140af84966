//! Canned LLM API responses for wiremock-backed tests

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::LlmClient;
use crate::config::{LlmConfig, LlmProvider};

/// Claude Messages API body with one text block
pub(crate) fn claude_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 1, "output_tokens": 1}
    }))
}

/// OpenAI chat completion body with one choice
pub(crate) fn openai_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl_test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1}
    }))
}

/// Serve `replies` in order on `POST /messages`, repeating the last one
pub(crate) async fn claude_server(replies: Vec<ResponseTemplate>) -> MockServer {
    let server = MockServer::start().await;
    let last = replies.len().saturating_sub(1);
    for (i, reply) in replies.into_iter().enumerate() {
        let mock = Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(reply);
        let mock = if i < last { mock.up_to_n_times(1) } else { mock };
        mock.mount(&server).await;
    }
    server
}

/// Claude client pointed at `server`
pub(crate) fn claude_client(server: &MockServer) -> LlmClient {
    let config = LlmConfig {
        api_key: "test_key".to_string(),
        provider: LlmProvider::Claude,
        ..LlmConfig::default()
    };
    LlmClient::with_base_url(&config, server.uri()).unwrap()
}

/// Number of requests the server has seen
pub(crate) async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}
