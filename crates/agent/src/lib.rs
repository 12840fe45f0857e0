//! The codeflow agent loop.
//!
//! An [`Orchestrator`] drives one task at a time through a
//! **Plan → Act → Observe → Decide** cycle:
//!
//! 1. **Bootstrap**: resolve the model, connect to or create a sandbox,
//!    clone the repository into a fresh one
//! 2. **Plan**: ask the model for an initial plan
//! 3. **Act**: ask for exactly one tool call and run it in the sandbox
//! 4. **Observe**: fold the tool output back into the conversation
//! 5. **Decide**: ask whether the task is done; stop on `DONE:`
//!
//! Steps 3 to 5 repeat until the model says it is done, a tool fails, or
//! the step limit is reached. Progress is reported as [`ToolEvent`]s on an
//! [`EventStream`].
//!
//! [`ToolEvent`]: codeflow_core::ToolEvent

pub mod orchestrator;
pub mod prompts;
pub mod stream;

pub use orchestrator::{AgentSettings, Orchestrator, SingleModel};
pub use stream::EventStream;
