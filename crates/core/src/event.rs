//! Progress events: the only thing a task run exposes to its caller.
//!
//! Events are written by the orchestrator into a channel it owns and read
//! by exactly one consumer (CLI printer, SSE response, test).

use serde::{Deserialize, Serialize};

/// One step of a task run.
///
/// Wire format:
/// - `plan` : the model's plan or next-step reasoning
/// - `tool` : a tool was executed (output absent if it failed)
/// - `log`  : bootstrap progress
/// - `done` : the run finished
/// - `error`: the run failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolEvent {
    Plan {
        content: String,
    },

    Tool {
        name: String,
        input: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    Log {
        content: String,
    },

    Done {
        summary: String,
    },

    Error {
        error: String,
    },
}

impl ToolEvent {
    pub fn plan(content: impl Into<String>) -> Self {
        Self::Plan {
            content: content.into(),
        }
    }

    pub fn log(content: impl Into<String>) -> Self {
        Self::Log {
            content: content.into(),
        }
    }

    pub fn done(summary: impl Into<String>) -> Self {
        Self::Done {
            summary: summary.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Plan { .. } => "plan",
            Self::Tool { .. } => "tool",
            Self::Log { .. } => "log",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// `done` and `error` end a stream; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
