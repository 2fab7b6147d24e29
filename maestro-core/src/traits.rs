//! The seam every agent role (planning, research, writing, reflection,
//! messenger, ...) is invoked through. The Model Dispatcher resolves a role
//! to a concrete provider and calls `execute`; nothing upstream needs to
//! know which provider answered.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::types::ComponentMetadata;

/// A chat-completion-shaped request: the message list plus optional
/// structured-output constraints, matching the wire shape described for
/// chat completion endpoints.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub messages: Vec<ChatMessage>,
    pub response_format: Option<Value>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub parameters: HashMap<String, Value>,
}

impl AgentInput {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            response_format: None,
            temperature: None,
            max_tokens: None,
            parameters: HashMap::new(),
        }
    }

    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            response_format: None,
            temperature: None,
            max_tokens: None,
            parameters: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// The dispatcher's response plus the usage/cost details every call reports,
/// even when a field is not provided by the underlying provider (it then
/// defaults to zero, per the design notes' "never propagate None into stats
/// fields").
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub content: String,
    pub details: UsageDetails,
}

#[derive(Debug, Clone, Default)]
pub struct UsageDetails {
    pub model_name: String,
    pub provider: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub native_total_tokens: u64,
    pub cost: f64,
}

/// Implemented by every agent role invoked through the Model Dispatcher.
#[async_trait]
pub trait BaseAgent: Send + Sync {
    fn metadata(&self) -> &ComponentMetadata;

    async fn execute(&self, input: AgentInput, context: ExecutionContext) -> Result<AgentOutput>;

    /// Cheap pre-flight validation; defaults to accepting anything non-empty.
    async fn validate_input(&self, input: &AgentInput) -> Result<()> {
        if input.messages.is_empty() {
            return Err(crate::error::MaestroError::internal(
                "agent input has no messages",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAgent(ComponentMetadata);

    #[async_trait]
    impl BaseAgent for EchoAgent {
        fn metadata(&self) -> &ComponentMetadata {
            &self.0
        }

        async fn execute(&self, input: AgentInput, _ctx: ExecutionContext) -> Result<AgentOutput> {
            let content = input
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(AgentOutput {
                content,
                details: UsageDetails::default(),
            })
        }
    }

    #[tokio::test]
    async fn echo_agent_roundtrips_prompt() {
        let agent = EchoAgent(ComponentMetadata::new("echo", "test double"));
        let out = agent
            .execute(
                AgentInput::from_prompt("hello"),
                ExecutionContext::for_mission("m1"),
            )
            .await
            .unwrap();
        assert_eq!(out.content, "hello");
    }

    #[tokio::test]
    async fn validate_input_rejects_empty_messages() {
        let agent = EchoAgent(ComponentMetadata::new("echo", "test double"));
        let input = AgentInput::with_messages(vec![]);
        assert!(agent.validate_input(&input).await.is_err());
    }
}
