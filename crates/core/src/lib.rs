//! # codeflow core
//!
//! Domain types, traits, and error definitions for the codeflow coding agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Model backends and sandboxes are seams. The traits and value types that
//! cross them live here so that:
//! - backends can be swapped via configuration
//! - the agent loop can be tested with scripted doubles
//! - every crate depends inward on core

pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod task;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ModelError, SandboxError, ToolError};
pub use event::ToolEvent;
pub use message::{ConversationHistory, Message, Role};
pub use model::{Completion, ModelClient, ModelResolver, Usage};
pub use task::{RunId, Task};
pub use tool::{ParamKind, ParamShape, ToolArgs, ToolCallPlan, ToolShape};
