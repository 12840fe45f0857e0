//! Model router: turns `provider:model` ids into clients.
//!
//! Provider credentials and endpoints come from configuration; a client is
//! built per resolution so that one router serves any number of models.

use std::collections::HashMap;
use std::sync::Arc;

use codeflow_config::AppConfig;
use codeflow_core::error::ModelError;
use codeflow_core::model::{ModelClient, ModelResolver, split_model_id};

use crate::anthropic::AnthropicClient;
use crate::openai_compat::OpenAiCompatClient;

#[derive(Debug, Clone)]
struct ProviderEndpoint {
    api_key: Option<String>,
    base_url: String,
}

/// Resolves model ids against configured providers.
pub struct ModelRouter {
    endpoints: HashMap<String, ProviderEndpoint>,
    fallback_key: Option<String>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            fallback_key: None,
        }
    }

    /// Register (or replace) a provider endpoint.
    pub fn register(
        &mut self,
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) {
        self.endpoints.insert(
            provider.into(),
            ProviderEndpoint {
                api_key,
                base_url: base_url.into(),
            },
        );
    }

    /// Key used by providers that have none of their own.
    pub fn with_fallback_key(mut self, key: Option<String>) -> Self {
        self.fallback_key = key;
        self
    }

    /// Build a router from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut router = Self::new().with_fallback_key(config.api_key.clone());

        for (name, provider_config) in &config.providers {
            let base_url = provider_config
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(name));
            router.register(name.clone(), base_url, provider_config.api_key.clone());
        }

        router
    }

    /// List all explicitly configured provider names.
    pub fn list(&self) -> Vec<&str> {
        self.endpoints.keys().map(|s| s.as_str()).collect()
    }

    fn endpoint(&self, provider: &str) -> ProviderEndpoint {
        let mut endpoint = self
            .endpoints
            .get(provider)
            .cloned()
            .unwrap_or_else(|| ProviderEndpoint {
                api_key: None,
                base_url: default_base_url(provider),
            });
        if endpoint.api_key.is_none() {
            endpoint.api_key = self.fallback_key.clone();
        }
        endpoint
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelResolver for ModelRouter {
    fn resolve(&self, model_id: &str) -> Result<Arc<dyn ModelClient>, ModelError> {
        let (provider, model) = split_model_id(model_id)?;

        let known = self.endpoints.contains_key(provider) || is_well_known(provider);
        if !known {
            return Err(ModelError::UnknownModel(model_id.to_string()));
        }

        let endpoint = self.endpoint(provider);
        let api_key = match endpoint.api_key {
            Some(key) => key,
            // local servers accept any key
            None if is_keyless(provider) => provider.to_string(),
            None => return Err(ModelError::NotConfigured(provider.to_string())),
        };

        let client: Arc<dyn ModelClient> = if provider == "anthropic" {
            let base_url = self
                .endpoints
                .get(provider)
                .map(|e| e.base_url.trim_end_matches("/v1").to_string())
                .unwrap_or_else(|| "https://api.anthropic.com".into());
            Arc::new(AnthropicClient::new(api_key, model).with_base_url(base_url))
        } else {
            Arc::new(OpenAiCompatClient::new(
                provider,
                endpoint.base_url,
                api_key,
                model,
            ))
        };

        Ok(client)
    }
}

fn is_well_known(provider: &str) -> bool {
    matches!(
        provider,
        "openrouter"
            | "openai"
            | "anthropic"
            | "ollama"
            | "deepseek"
            | "groq"
            | "together"
            | "fireworks"
            | "vllm"
            | "llamacpp"
    )
}

fn is_keyless(provider: &str) -> bool {
    matches!(provider, "ollama" | "vllm" | "llamacpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "anthropic" => "https://api.anthropic.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeflow_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn resolves_with_fallback_key() {
        let router = ModelRouter::new().with_fallback_key(Some("sk-test".into()));
        let client = router.resolve("openai:gpt-4o-mini").unwrap();
        assert_eq!(client.name(), "openai");

        let client = router.resolve("anthropic:claude-sonnet-4-20250514").unwrap();
        assert_eq!(client.name(), "anthropic");
    }

    #[test]
    fn missing_key_is_not_configured() {
        let router = ModelRouter::new();
        assert!(matches!(
            router.resolve("openai:gpt-4o-mini").err(),
            Some(ModelError::NotConfigured(p)) if p == "openai"
        ));
        // local servers need no key
        assert!(router.resolve("ollama:llama3").is_ok());
    }

    #[test]
    fn unknown_provider_and_malformed_ids() {
        let router = ModelRouter::new().with_fallback_key(Some("k".into()));
        assert!(matches!(
            router.resolve("nosuch:model").err(),
            Some(ModelError::UnknownModel(_))
        ));
        assert!(matches!(
            router.resolve("gpt-4o").err(),
            Some(ModelError::UnknownModel(_))
        ));
    }

    #[test]
    fn build_from_config_registers_custom_providers() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "corp".into(),
            ProviderConfig {
                api_key: Some("corp-key".into()),
                api_url: Some("https://llm.corp.internal/v1".into()),
            },
        );

        let router = ModelRouter::from_config(&config);
        assert!(router.list().contains(&"corp"));
        let client = router.resolve("corp:mixtral").unwrap();
        assert_eq!(client.name(), "corp");
    }
}
