//! Error types for the codeflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    #[error("Sandbox not found: {0}")]
    NotFound(String),

    #[error("Sandbox API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Command failed (exit {exit_code}): {output}")]
    CommandFailed { exit_code: i32, output: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sandbox operation timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("{0}")]
    Sandbox(#[from] SandboxError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_displays_correctly() {
        let err = ModelError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn command_failure_carries_context() {
        let err = SandboxError::CommandFailed {
            exit_code: 2,
            output: "ls: cannot access 'nope'".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed (exit 2): ls: cannot access 'nope'"
        );
    }

    #[test]
    fn tool_error_passes_sandbox_message_through() {
        let err: ToolError = SandboxError::FileNotFound("src/main.rs".into()).into();
        assert_eq!(err.to_string(), "File not found: src/main.rs");
    }
}
