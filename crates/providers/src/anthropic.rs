//! Anthropic native model client.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field
//!
//! The Messages API has no JSON mode, so tool selection relies on the
//! catalog instruction and the tolerant decoder in
//! [`ToolCallPlan::from_model_output`].

use async_trait::async_trait;
use codeflow_core::error::ModelError;
use codeflow_core::message::{Message, Role};
use codeflow_core::model::{Completion, ModelClient, Usage};
use codeflow_core::tool::{ToolCallPlan, ToolShape};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{COMPLETION_TEMPERATURE, TOOL_CALL_TEMPERATURE, with_tool_catalog};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// A client for one model on Anthropic's Messages API.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        }
    }

    /// Use a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Anthropic takes the system prompt as a top-level field, not a message.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage<'_>>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut turns = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User | Role::Assistant => turns.push(AnthropicMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, turns)
    }

    async fn send(&self, messages: &[Message], temperature: f64) -> Result<Completion, ModelError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, turns) = Self::extract_system(messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": turns,
            "max_tokens": self.max_tokens,
            "temperature": temperature,
        });

        if let Some(ref sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        debug!(provider = "anthropic", model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ModelError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ModelError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ModelError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse =
            response.json().await.map_err(|e| ModelError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Anthropic response: {e}"),
            })?;

        Ok(Self::into_completion(api_resp))
    }

    fn into_completion(resp: AnthropicResponse) -> Completion {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Completion {
            text,
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        self.send(messages, COMPLETION_TEMPERATURE).await
    }

    async fn plan_tool(
        &self,
        messages: &[Message],
        tools: &[ToolShape],
    ) -> Result<ToolCallPlan, ModelError> {
        let messages = with_tool_catalog(messages, tools);
        let completion = self.send(&messages, TOOL_CALL_TEMPERATURE).await?;
        Ok(ToolCallPlan::from_model_output(&completion.text))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
