//! LLM client module for agentflow
//!
//! This module provides the client used as the completion collaborator of
//! the conversation engine. It speaks the OpenAI-compatible chat API with
//! legacy function calling, which is also what DeepSeek and most local
//! gateways expose.

pub mod error;
pub mod openai;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;

pub use error::LLMError;
pub use openai::{ChatRequest, ChatResponse};
pub use retry::RetryPolicy;

use crate::capability::CapabilityDefinition;
use crate::core::completion::Completion;
use crate::core::message::{Message, Reply};
use crate::core::settings::CallSettings;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Configuration for an OpenAI-compatible endpoint
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL without the `/v1` suffix (default: https://api.openai.com)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// LLM client wrapper around reqwest::Client
#[derive(Clone)]
pub struct Client {
    /// The underlying HTTP client
    pub(crate) client: reqwest::Client,
    pub(crate) config: OpenAiConfig,
    pub(crate) retry: RetryPolicy,
}

impl Client {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for every request.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// The underlying HTTP client, shared with capabilities that fetch URLs.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Completion for Client {
    async fn respond(
        &self,
        call: &CallSettings<'_>,
        messages: &[Message],
        capabilities: &[CapabilityDefinition],
    ) -> Result<Reply, LLMError> {
        self.chat(call, messages, capabilities).await
    }
}

// ============================================================================
// Deref to reqwest::Client for direct HTTP usage
// ============================================================================

impl std::ops::Deref for Client {
    type Target = reqwest::Client;
    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{CallMode, Settings};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> Client {
        Client::new(OpenAiConfig::new("test-key").with_base_url(server.uri())).with_retry(
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0),
        )
    }

    fn content_response(text: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("key");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.base_url, "https://api.openai.com");

        let custom = OpenAiConfig::new("key").with_base_url("http://localhost:8080/");
        assert_eq!(custom.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_chat_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(content_response("Hello!")))
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings::default();
        let reply = test_client(&server)
            .respond(&settings.call(CallMode::None), &[Message::user("Hi")], &[])
            .await
            .unwrap();
        assert_eq!(reply, Reply::Content("Hello!".to_string()));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body["messages"], json!([{"role": "user", "content": "Hi"}]));
        assert!(body.get("functions").is_none());
        assert!(body.get("function_call").is_none());
    }

    #[tokio::test]
    async fn test_chat_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(content_response("ok")))
            .mount(&server)
            .await;

        let settings = Settings::default();
        let reply = test_client(&server)
            .chat(&settings.call(CallMode::None), &[Message::user("Hi")], &[])
            .await
            .unwrap();
        assert_eq!(reply, Reply::Content("ok".to_string()));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_chat_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let settings = Settings::default();
        let err = test_client(&server)
            .chat(&settings.call(CallMode::None), &[Message::user("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::RetriesExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_chat_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings::default();
        let err = test_client(&server)
            .chat(&settings.call(CallMode::None), &[Message::user("Hi")], &[])
            .await
            .unwrap_err();
        match err {
            LLMError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_chat_without_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let settings = Settings::default();
        let err = test_client(&server)
            .chat(&settings.call(CallMode::None), &[Message::user("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"created": 1, "data": [{"url": "http://img/1.png"}]})),
            )
            .mount(&server)
            .await;

        let url = test_client(&server)
            .generate_image("a cat", 1, "1024x1024")
            .await
            .unwrap();
        assert_eq!(url, "http://img/1.png");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body, json!({"prompt": "a cat", "n": 1, "size": "1024x1024"}));
    }
}
