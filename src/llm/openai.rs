//! OpenAI-compatible chat completions (legacy `functions` calling) and
//! image generation.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityDefinition;
use crate::core::message::{CapabilityCall, Message, Reply};
use crate::core::settings::{CallMode, CallSettings};
use crate::llm::error::LLMError;
use crate::llm::Client;

/// Request body for `/v1/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<&'a [CapabilityDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<&'a CallMode>,
}

impl<'a> ChatRequest<'a> {
    /// Builds the request body. The function list and the call mode are only
    /// sent when there is at least one capability definition.
    pub fn new(
        call: &'a CallSettings<'a>,
        messages: &'a [Message],
        capabilities: &'a [CapabilityDefinition],
    ) -> Self {
        let settings = call.settings;
        let has_functions = !capabilities.is_empty();
        Self {
            model: &settings.model,
            messages,
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            functions: has_functions.then_some(capabilities),
            function_call: has_functions.then_some(&call.mode),
        }
    }
}

/// Response from `/v1/chat/completions`.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub function_call: Option<CapabilityCall>,
}

impl From<ResponseMessage> for Reply {
    fn from(message: ResponseMessage) -> Self {
        Reply::from_parts(message.content, message.function_call)
    }
}

#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub n: u32,
    pub size: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub url: String,
}

impl Client {
    /// Call the chat completions endpoint and return the first choice as a [`Reply`].
    pub async fn chat(
        &self,
        call: &CallSettings<'_>,
        messages: &[Message],
        capabilities: &[CapabilityDefinition],
    ) -> Result<Reply, LLMError> {
        let request = ChatRequest::new(call, messages, capabilities);
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        log::debug!(
            "Chat request: model={} messages={} functions={} mode={:?}",
            request.model,
            messages.len(),
            capabilities.len(),
            call.mode
        );

        let response = self
            .retry
            .send(|| {
                self.client
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
            })
            .await?;

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| Reply::from(choice.message))
            .ok_or_else(|| LLMError::InvalidResponse("No choices in response".to_string()))
    }

    /// Generate images from a prompt and return the URL of the first one.
    pub async fn generate_image(&self, prompt: &str, n: u32, size: &str) -> Result<String, LLMError> {
        let request = ImageRequest { prompt, n, size };
        let url = format!("{}/v1/images/generations", self.config.base_url);

        let response = self
            .retry
            .send(|| {
                self.client
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .json(&request)
            })
            .await?;

        let image_response: ImageResponse = response.json().await?;
        image_response
            .data
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| LLMError::InvalidResponse("No images in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::Settings;
    use serde_json::json;

    fn definition() -> CapabilityDefinition {
        CapabilityDefinition {
            name: "get_url".to_string(),
            description: "Fetch the contents of a URL.".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_request_without_functions_omits_call_mode() {
        let settings = Settings::default();
        let call = settings.call(CallMode::None);
        let messages = [Message::user("Hi")];
        let request = ChatRequest::new(&call, &messages, &[]);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4",
                "messages": [{"role": "user", "content": "Hi"}],
                "temperature": 1.0
            })
        );
    }

    #[test]
    fn test_request_with_forced_function() {
        let settings = Settings {
            max_tokens: Some(100),
            ..Settings::default()
        };
        let call = settings.call(CallMode::Force("get_url".into()));
        let messages = [Message::user("Fetch it")];
        let definitions = [definition()];
        let request = ChatRequest::new(&call, &messages, &definitions);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["function_call"], json!({"name": "get_url"}));
        assert_eq!(value["functions"][0]["name"], "get_url");
        assert_eq!(value["max_tokens"], 100);
        assert!(value.get("top_p").is_none());
    }

    #[test]
    fn test_response_message_to_reply() {
        let message: ResponseMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "function_call": {"name": "get_url", "arguments": "{\"url\":\"http://x\"}"}
        }))
        .unwrap();
        assert_eq!(
            Reply::from(message),
            Reply::CapabilityCall(CapabilityCall::new("get_url", "{\"url\":\"http://x\"}"))
        );
    }
}
