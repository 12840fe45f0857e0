//! Scripted model and sandbox fixtures for orchestrator tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codeflow_agent::{AgentSettings, Orchestrator, SingleModel};
use codeflow_core::{
    Completion, Message, ModelClient, ModelError, ToolCallPlan, ToolEvent, ToolShape,
};
use codeflow_sandbox::MemorySandboxProvider;
use serde_json::Value;

pub const ROOT: &str = "/home/user/workspace";
pub const MODEL: &str = "mock:scripted";

/// A model that replays scripted replies in order.
///
/// Completions (the plan, then one verdict per step) and tool calls come
/// from separate queues. An exhausted completion queue keeps answering
/// with a non-final verdict; an exhausted tool queue keeps asking for
/// `cmd.run true`.
pub struct ScriptedModel {
    completions: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<VecDeque<Result<ToolCallPlan, ModelError>>>,
    completion_prompts: Mutex<Vec<Vec<Message>>>,
    call_prompts: Mutex<Vec<Vec<Message>>>,
    shapes_seen: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            calls: Mutex::new(VecDeque::new()),
            completion_prompts: Mutex::new(Vec::new()),
            call_prompts: Mutex::new(Vec::new()),
            shapes_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.completions.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn reply_err(self, err: ModelError) -> Self {
        self.completions.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn call(self, name: &str, args: Value) -> Self {
        self.calls
            .lock()
            .unwrap()
            .push_back(Ok(ToolCallPlan::parsed(name, args)));
        self
    }

    pub fn call_plan(self, plan: ToolCallPlan) -> Self {
        self.calls.lock().unwrap().push_back(Ok(plan));
        self
    }

    pub fn completion_prompts(&self) -> Vec<Vec<Message>> {
        self.completion_prompts.lock().unwrap().clone()
    }

    pub fn call_prompts(&self) -> Vec<Vec<Message>> {
        self.call_prompts.lock().unwrap().clone()
    }

    pub fn tool_calls_made(&self) -> usize {
        self.call_prompts.lock().unwrap().len()
    }

    pub fn shapes_seen(&self) -> Vec<String> {
        self.shapes_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        self.completion_prompts
            .lock()
            .unwrap()
            .push(messages.to_vec());
        let next = self.completions.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(Completion::text(text)),
            Some(Err(e)) => Err(e),
            None => Ok(Completion::text("Next: keep going")),
        }
    }

    async fn plan_tool(
        &self,
        messages: &[Message],
        tools: &[ToolShape],
    ) -> Result<ToolCallPlan, ModelError> {
        self.call_prompts.lock().unwrap().push(messages.to_vec());
        *self.shapes_seen.lock().unwrap() = tools.iter().map(|t| t.name.clone()).collect();
        let next = self.calls.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ToolCallPlan::parsed("cmd.run", serde_json::json!({"cmd": "true"}))))
    }
}

pub fn orchestrator(
    model: Arc<ScriptedModel>,
    sandboxes: Arc<MemorySandboxProvider>,
    max_steps: u32,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(SingleModel(model)),
        sandboxes,
        AgentSettings::default().with_max_steps(max_steps),
    )
}

/// Events other than `log`.
pub fn without_logs(events: &[ToolEvent]) -> Vec<ToolEvent> {
    events
        .iter()
        .filter(|e| !matches!(e, ToolEvent::Log { .. }))
        .cloned()
        .collect()
}

pub fn logs(events: &[ToolEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ToolEvent::Log { content } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

pub fn terminal_count(events: &[ToolEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}
