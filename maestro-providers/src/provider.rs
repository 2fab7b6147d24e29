//! The OpenAI-compatible wire protocol (spec §6): a request carries
//! `{messages, model, temperature, max_tokens, response_format?}`; a
//! response exposes `choices[0].message.content` and a `usage` block, plus
//! an optional `cost` field.

use async_trait::async_trait;
use maestro_core::error::{MaestroError, Result};
use maestro_core::traits::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost: Option<f64>,
}

/// Implemented by every chat-completion backend (OpenRouter, a local
/// OpenAI-compatible endpoint, a user-supplied custom endpoint). Swapping
/// providers never changes the call signature, per spec §4.2.
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a serde_json::Value>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    cost: Option<f64>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// OpenAI-compatible HTTP provider serving OpenRouter, a local endpoint, or a
/// user-supplied custom endpoint — the same struct covers all three per spec
/// §6, differing only in base URL, API key, and provider label.
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .expect("reqwest client builds with a static timeout"),
        }
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let wire_messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: role_str(m.role),
                content: &m.content,
            })
            .collect();

        let wire_request = WireRequest {
            model: &request.model,
            messages: wire_messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format.as_ref(),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            MaestroError::TransientProvider {
                message: format!("request to {} failed: {e}", self.name),
                provider: Some(self.name.clone()),
                source: Some(e.into()),
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(MaestroError::AuthenticationFailed {
                message: format!("{} rejected credentials (status {status})", self.name),
                provider: Some(self.name.clone()),
            });
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MaestroError::transient(
                format!("{} returned status {status}", self.name),
                self.name.clone(),
            ));
        }
        if !status.is_success() {
            return Err(MaestroError::internal(format!(
                "{} returned unexpected status {status}",
                self.name
            )));
        }

        let body: WireResponse = response.json().await.map_err(|e| {
            MaestroError::ParseFailure {
                message: format!("invalid response body from {}: {e}", self.name),
            }
        })?;

        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let usage = body.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cost: body.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        content: String,
    }

    #[async_trait]
    impl ChatCompletionProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: self.content.clone(),
                prompt_tokens: 1,
                completion_tokens: 1,
                total_tokens: 2,
                cost: Some(0.0001),
            })
        }
    }

    #[tokio::test]
    async fn stub_provider_roundtrips() {
        let provider = StubProvider {
            content: "hello".into(),
        };
        let response = provider
            .complete(CompletionRequest {
                messages: vec![ChatMessage::user("hi")],
                model: "test-model".into(),
                temperature: None,
                max_tokens: None,
                response_format: None,
            })
            .await
            .unwrap();
        assert_eq!(response.content, "hello");
    }
}
