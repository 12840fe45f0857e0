//! Model client trait: the abstraction over LLM backends.
//!
//! The agent loop needs exactly two things from a model: free-form text,
//! and a choice of the next tool. Every backend (OpenAI-compatible,
//! Anthropic, test doubles) implements [`ModelClient`] and the loop never
//! learns which one it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ModelError;
use crate::message::Message;
use crate::tool::{ToolCallPlan, ToolShape};

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A free-form completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// The core model trait.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a conversation and get free-form text back.
    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError>;

    /// Ask the model to choose exactly one tool.
    ///
    /// Transport failures are errors. A reply that cannot be read as a
    /// tool call is not: it comes back as [`ToolCallPlan::Unparsed`].
    async fn plan_tool(
        &self,
        messages: &[Message],
        tools: &[ToolShape],
    ) -> Result<ToolCallPlan, ModelError>;
}

/// Turns a model id such as `openai:gpt-4o-mini` into a client.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, model_id: &str) -> Result<Arc<dyn ModelClient>, ModelError>;
}

/// Split `provider:model` into its two halves.
pub fn split_model_id(model_id: &str) -> Result<(&str, &str), ModelError> {
    match model_id.split_once(':') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(ModelError::UnknownModel(model_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_provider_prefix() {
        assert_eq!(
            split_model_id("openai:gpt-4o-mini").unwrap(),
            ("openai", "gpt-4o-mini")
        );
        // only the first colon separates
        assert_eq!(
            split_model_id("ollama:llama3:8b").unwrap(),
            ("ollama", "llama3:8b")
        );
    }

    #[test]
    fn rejects_bare_model_names() {
        assert!(matches!(
            split_model_id("gpt-4o"),
            Err(ModelError::UnknownModel(_))
        ));
        assert!(split_model_id("openai:").is_err());
    }

    #[test]
    fn completion_serialization_skips_missing_usage() {
        let json = serde_json::to_string(&Completion::text("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);
    }
}
