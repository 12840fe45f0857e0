//! LLM model clients for codeflow.
//!
//! All clients implement [`codeflow_core::ModelClient`]. The
//! [`ModelRouter`] turns `provider:model` ids into clients based on
//! configuration.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicClient;
pub use openai_compat::OpenAiCompatClient;
pub use router::ModelRouter;

use codeflow_core::{Message, Role, ToolShape};

/// Sampling temperature for free-form completions.
pub const COMPLETION_TEMPERATURE: f64 = 0.2;

/// Sampling temperature for tool selection.
pub const TOOL_CALL_TEMPERATURE: f64 = 0.0;

/// Insert the tool catalog as a system message after any leading system
/// messages.
pub(crate) fn with_tool_catalog(messages: &[Message], tools: &[ToolShape]) -> Vec<Message> {
    let split = messages
        .iter()
        .position(|m| m.role != Role::System)
        .unwrap_or(messages.len());

    let mut out = Vec::with_capacity(messages.len() + 1);
    out.extend_from_slice(&messages[..split]);
    out.push(Message::system(ToolShape::catalog(tools)));
    out.extend_from_slice(&messages[split..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeflow_core::{ParamKind, ParamShape};

    #[test]
    fn catalog_follows_system_prompt() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("Task: x"),
        ];
        let tools = vec![ToolShape {
            name: "cmd.run".into(),
            description: "Run a command".into(),
            params: vec![ParamShape::required("cmd", ParamKind::String)],
        }];

        let out = with_tool_catalog(&messages, &tools);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].content, "be brief");
        assert_eq!(out[1].role, Role::System);
        assert!(out[1].content.contains("cmd.run { cmd: string }"));
        assert_eq!(out[2].content, "Task: x");
    }
}
