//! OpenAI-compatible model client.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, DeepSeek, Groq,
//! Together AI, Fireworks AI, and any endpoint that exposes
//! `/chat/completions`.
//!
//! Tool selection uses JSON mode (`response_format: json_object`) rather
//! than native function calling; the reply is decoded with
//! [`ToolCallPlan::from_model_output`].

use async_trait::async_trait;
use codeflow_core::error::ModelError;
use codeflow_core::message::Message;
use codeflow_core::model::{Completion, ModelClient, Usage};
use codeflow_core::tool::{ToolCallPlan, ToolShape};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{COMPLETION_TEMPERATURE, TOOL_CALL_TEMPERATURE, with_tool_catalog};

/// A client for one model on an OpenAI-compatible endpoint.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }

    async fn chat(
        &self,
        messages: &[Message],
        temperature: f64,
        json_mode: bool,
    ) -> Result<Completion, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(messages),
            "temperature": temperature,
            "stream": false,
        });

        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        debug!(provider = %self.name, model = %self.model, json_mode, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ModelError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ModelError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ModelError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        self.chat(messages, COMPLETION_TEMPERATURE, false).await
    }

    async fn plan_tool(
        &self,
        messages: &[Message],
        tools: &[ToolShape],
    ) -> Result<ToolCallPlan, ModelError> {
        let messages = with_tool_catalog(messages, tools);
        let completion = self.chat(&messages, TOOL_CALL_TEMPERATURE, true).await?;
        Ok(ToolCallPlan::from_model_output(&completion.text))
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
