//! Completion client: the boundary to the external chat-completion service
//!
//! Defines the client trait and two implementations:
//! - `OpenAiClient`: POSTs to an OpenAI-compatible `/chat/completions` endpoint
//! - `MockClient`: returns scripted responses (testing)
//!
//! No retries happen here. A failed call is reported once and the caller
//! decides what to do with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Errors from completion calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    /// Non-success status, transport failure, or a response without content.
    /// `status` is `None` when no HTTP response was received.
    #[error("completion request failed ({}): {body}", .status.map(|s| s.to_string()).unwrap_or_else(|| "no response".to_string()))]
    RequestFailed { status: Option<u16>, body: String },
}

impl CompletionError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        CompletionError::RequestFailed {
            status: None,
            body: err.to_string(),
        }
    }
}

/// Client trait for the completion service.
///
/// Abstracts over transport so the generation pipeline doesn't depend on
/// how the service is reached.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the first choice's text content.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, CompletionError>;
}

/// Connection settings for [`OpenAiClient`]
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    top_p: f32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for OpenAI-compatible chat completions
pub struct OpenAiClient {
    http: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(CompletionError::transport)?;
        Ok(Self { http, settings })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            max_tokens: self.settings.max_tokens,
            top_p: self.settings.top_p,
            temperature,
        };

        let response = self
            .http
            .post(self.settings.endpoint.as_str())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CompletionError::RequestFailed {
            status: Some(status.as_u16()),
            body: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(CompletionError::RequestFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::RequestFailed {
                status: Some(status.as_u16()),
                body: format!("unparsable response ({}): {}", e, body),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::RequestFailed {
                status: Some(status.as_u16()),
                body,
            })
    }
}

/// Mock client for testing. Returns scripted responses in order.
///
/// Every call is recorded so tests can inspect the prompts that were sent.
#[derive(Default)]
pub struct MockClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failed response with the given status.
    pub fn with_failure(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Err(CompletionError::RequestFailed {
            status: Some(status),
            body: body.into(),
        }));
        self
    }

    fn push(&self, item: Result<String, CompletionError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    /// Messages sent on each call so far
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(CompletionError::RequestFailed {
                    status: None,
                    body: "mock script exhausted".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_responses_in_order() {
        let client = MockClient::new().with_response("first").with_response("second");

        let msgs = [ChatMessage::user("hi")];
        assert_eq!(client.complete(&msgs, 0.7).await.unwrap(), "first");
        assert_eq!(client.complete(&msgs, 0.7).await.unwrap(), "second");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_failure_carries_status() {
        let client = MockClient::new().with_failure(429, "rate limited");
        let err = client.complete(&[ChatMessage::user("hi")], 0.0).await.unwrap_err();
        let CompletionError::RequestFailed { status, body } = err;
        assert_eq!(status, Some(429));
        assert_eq!(body, "rate limited");
    }

    #[tokio::test]
    async fn exhausted_mock_fails() {
        let client = MockClient::new();
        assert!(client.complete(&[ChatMessage::user("hi")], 0.0).await.is_err());
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "be brief"}));
    }

    #[test]
    fn request_body_carries_generation_parameters() {
        let messages = [ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: 8000,
            top_p: 1.0,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 8000);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn first_choice_content_is_extracted() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"payload"}},{"message":{"content":"other"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let text = parsed.choices.into_iter().next().and_then(|c| c.message.content);
        assert_eq!(text.as_deref(), Some("payload"));
    }

    #[test]
    fn error_display_mentions_status() {
        let err = CompletionError::RequestFailed {
            status: Some(500),
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "completion request failed (500): boom");
        assert!(CompletionError::transport("timed out")
            .to_string()
            .contains("no response"));
    }
}
