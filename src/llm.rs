//! Generation service abstraction.
//!
//! The pipeline talks to a chat-completion model through the [`ChatModel`]
//! trait. [`OpenAIChat`] calls an OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint and returns the text of the
//! first choice. Tests provide scripted implementations instead.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Credentials, LlmConfig};
use crate::error::{AdvisorError, AdvisorResult};
use crate::transport::{post_json, Endpoint};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one request and return the assistant message text, unparsed.
    async fn complete(&self, request: &ChatRequest) -> AdvisorResult<String>;
}

/// Chat backend for OpenAI-compatible APIs (OpenRouter, OpenAI, vLLM, ...).
#[derive(Debug)]
pub struct OpenAIChat {
    endpoint: Endpoint,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig, credentials: &Credentials) -> AdvisorResult<Self> {
        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let endpoint = Endpoint::new(
            "generation",
            url,
            credentials.api_key.clone(),
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self { endpoint })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(&self, request: &ChatRequest) -> AdvisorResult<String> {
        let body = serde_json::to_value(request)
            .map_err(|e| AdvisorError::Schema(format!("failed to encode chat request: {}", e)))?;
        let json = post_json(&self.endpoint, &body).await?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat-completion response.
fn parse_chat_response(json: &Value) -> AdvisorResult<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AdvisorError::Schema(
                "chat response missing choices[0].message.content".to_string(),
            )
        })
}
