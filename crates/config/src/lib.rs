//! Configuration loading, validation, and management for codeflow.
//!
//! Loads configuration from `~/.codeflow/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codeflow/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key shared by every model provider without its own key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when a task does not name one (`provider:model`)
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Provider-specific configurations, keyed by model id prefix
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Sandbox backend settings
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "openai:gpt-4o-mini".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_model", &self.default_model)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("sandbox", &self.sandbox)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on tool-call iterations per task
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_steps() -> u32 {
    24
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            system_prompt_override: None,
        }
    }
}

/// Which sandbox implementation backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxBackendKind {
    /// Remote sandbox service over HTTP
    Remote,
    /// Host directories and `sh -c` (no isolation, development only)
    Local,
    /// In-process file map (dry runs)
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_backend")]
    pub backend: SandboxBackendKind,

    /// Base URL of the remote sandbox service
    #[serde(default = "default_sandbox_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Template to boot new remote sandboxes from
    #[serde(default = "default_template")]
    pub template: String,

    /// Canonical workspace root inside a remote sandbox
    #[serde(default = "default_workspace_root")]
    pub workspace_root: String,

    /// Base directory for the local backend (default: ~/.codeflow/sandboxes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,

    /// Per-request timeout for sandbox calls
    #[serde(default = "default_sandbox_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> SandboxBackendKind {
    SandboxBackendKind::Remote
}
fn default_sandbox_url() -> String {
    "http://localhost:49982".into()
}
fn default_template() -> String {
    "codeflow-agent".into()
}
fn default_workspace_root() -> String {
    "/home/user/workspace".into()
}
fn default_sandbox_timeout() -> u64 {
    300
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_url: default_sandbox_url(),
            api_key: None,
            template: default_template(),
            workspace_root: default_workspace_root(),
            local_dir: None,
            request_timeout_secs: default_sandbox_timeout(),
        }
    }
}

impl std::fmt::Debug for SandboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxConfig")
            .field("backend", &self.backend)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("template", &self.template)
            .field("workspace_root", &self.workspace_root)
            .field("local_dir", &self.local_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3001
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codeflow/config.toml).
    ///
    /// Environment overrides:
    /// - `CODEFLOW_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY`: global API key
    /// - `ANTHROPIC_API_KEY`: Anthropic provider key
    /// - `CODEFLOW_MODEL`: default model
    /// - `CODEFLOW_SANDBOX_API_KEY`, `E2B_API_KEY`: sandbox service key
    /// - `CODEFLOW_SANDBOX_URL`: sandbox service URL
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("CODEFLOW_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            let anthropic = self.providers.entry("anthropic".into()).or_default();
            if anthropic.api_key.is_none() {
                anthropic.api_key = Some(key);
            }
        }

        if let Some(model) = lookup("CODEFLOW_MODEL") {
            self.default_model = model;
        }

        if self.sandbox.api_key.is_none() {
            self.sandbox.api_key =
                lookup("CODEFLOW_SANDBOX_API_KEY").or_else(|| lookup("E2B_API_KEY"));
        }

        if let Some(url) = lookup("CODEFLOW_SANDBOX_URL") {
            self.sandbox.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codeflow")
    }

    /// Base directory for local-backend sandboxes.
    pub fn local_sandbox_dir(&self) -> PathBuf {
        self.sandbox
            .local_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("sandboxes"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if !self.sandbox.workspace_root.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "sandbox.workspace_root must be absolute, got '{}'",
                self.sandbox.workspace_root
            )));
        }

        if !self.default_model.contains(':') {
            return Err(ConfigError::ValidationError(format!(
                "default_model must look like 'provider:model', got '{}'",
                self.default_model
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            providers: HashMap::new(),
            agent: AgentConfig::default(),
            sandbox: SandboxConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
