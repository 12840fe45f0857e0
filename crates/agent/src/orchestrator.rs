//! The task loop.
//!
//! One run walks through bootstrap, an initial plan, then up to
//! `max_steps` iterations of tool call, execution and verdict. Every
//! outcome, including failure, is reported on the run's event stream;
//! nothing is returned to the caller as an error.

use std::fmt::Display;
use std::sync::Arc;

use codeflow_config::AppConfig;
use codeflow_core::{
    ConversationHistory, Message, ModelClient, ModelResolver, RunId, Task, ToolCallPlan, ToolEvent,
};
use codeflow_sandbox::{SandboxClient, SandboxProvider};
use codeflow_tools::ToolRegistry;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::prompts::{self, TOOL_CALL_INSTRUCTION, VERDICT_INSTRUCTION};
use crate::stream::EventStream;

/// Events buffered between the run and a slow consumer.
pub const EVENT_BUFFER: usize = 64;

/// Tool output carried on a `tool` event.
pub const EVENT_OUTPUT_LIMIT: usize = 2000;

/// Tool output folded into the conversation.
pub const HISTORY_OUTPUT_LIMIT: usize = 4000;

#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Loop iterations before the run is ended as done.
    pub max_steps: u32,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 24,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_steps: config.agent.max_steps,
            system_prompt: config.agent.system_prompt_override.clone(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Why a run stopped early.
enum Stop {
    /// Report the message as the run's `error` event.
    Fatal(String),
    /// Nobody is listening any more.
    Closed,
}

fn fatal(e: impl Display) -> Stop {
    Stop::Fatal(e.to_string())
}

struct Emitter {
    tx: mpsc::Sender<ToolEvent>,
}

impl Emitter {
    async fn emit(&self, event: ToolEvent) -> Result<(), Stop> {
        self.tx.send(event).await.map_err(|_| Stop::Closed)
    }

    async fn log(&self, content: impl Into<String>) -> Result<(), Stop> {
        self.emit(ToolEvent::log(content)).await
    }
}

/// Runs tasks against a model and a sandbox.
///
/// Cheap to clone; every run gets its own sandbox handle and history.
#[derive(Clone)]
pub struct Orchestrator {
    models: Arc<dyn ModelResolver>,
    sandboxes: Arc<dyn SandboxProvider>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl Orchestrator {
    pub fn new(
        models: Arc<dyn ModelResolver>,
        sandboxes: Arc<dyn SandboxProvider>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            models,
            sandboxes,
            tools: Arc::new(ToolRegistry::builtin()),
            settings,
        }
    }

    /// Replace the built-in tool set.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    /// Start a run in the background and return its event stream.
    ///
    /// The stream ends with exactly one `done` or `error` event, unless it
    /// is dropped first, in which case the run stops at its next event.
    pub fn run(&self, task: Task) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = self.clone();
        tokio::spawn(async move { this.execute(task, tx).await });
        EventStream::new(rx)
    }

    async fn execute(&self, task: Task, tx: mpsc::Sender<ToolEvent>) {
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id);

        async {
            info!(model = %task.model_id(), "Run started");
            let emitter = Emitter { tx };

            match self.drive(&task, &emitter).await {
                Ok(()) => info!("Run finished"),
                Err(Stop::Fatal(message)) => {
                    warn!(error = %message, "Run failed");
                    // the receiver may already be gone
                    let _ = emitter.emit(ToolEvent::error(message)).await;
                }
                Err(Stop::Closed) => debug!("Event stream closed, stopping run"),
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, task: &Task, out: &Emitter) -> Result<(), Stop> {
        let model = self.models.resolve(task.model_id()).map_err(fatal)?;
        let sandbox = self.bootstrap(task, out).await?;

        let system = self
            .settings
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompts::system_prompt(sandbox.workspace_root()));

        let plan = model
            .complete(&[
                Message::system(&system),
                Message::user(prompts::planning_prompt(task.description())),
            ])
            .await
            .map_err(fatal)?
            .text;
        out.emit(ToolEvent::plan(&plan)).await?;

        let mut history = ConversationHistory::new();
        history.push(Message::user(format!("Task: {}", task.description())));
        history.push(Message::assistant(plan));

        let shapes = self.tools.shapes();
        for step in 1..=self.settings.max_steps {
            debug!(step, history_len = history.len(), "Requesting tool call");

            let call = model
                .plan_tool(&history.prompt(&system, TOOL_CALL_INSTRUCTION), &shapes)
                .await
                .map_err(fatal)?;

            self.execute_tool(&call, &sandbox, &mut history, out).await?;

            let verdict = model
                .complete(&history.prompt(&system, VERDICT_INSTRUCTION))
                .await
                .map_err(fatal)?
                .text;

            if prompts::is_done(&verdict) {
                info!(step, "Model reported the task done");
                return out.emit(ToolEvent::done(verdict)).await;
            }

            out.emit(ToolEvent::plan(&verdict)).await?;
            history.push(Message::assistant(verdict));
        }

        info!(max_steps = self.settings.max_steps, "Step limit reached");
        out.emit(ToolEvent::done(format!(
            "Stopped after reaching the limit of {} steps without a DONE verdict",
            self.settings.max_steps
        )))
        .await
    }

    /// Connect to the requested sandbox, or create one and clone into it.
    async fn bootstrap(&self, task: &Task, out: &Emitter) -> Result<SandboxClient, Stop> {
        let (backend, created) = match task.existing_sandbox_id() {
            Some(id) => {
                out.log(format!("Connecting to sandbox {id}...")).await?;
                (self.sandboxes.connect(id).await.map_err(fatal)?, false)
            }
            None => {
                out.log("Creating sandbox...").await?;
                (self.sandboxes.create().await.map_err(fatal)?, true)
            }
        };

        let sandbox = SandboxClient::new(backend);
        info!(sandbox_id = %sandbox.id(), provider = %self.sandboxes.name(), "Sandbox ready");
        out.log(format!("Sandbox {} ready", sandbox.id())).await?;

        sandbox.ensure_workspace().await.map_err(fatal)?;

        if let (true, Some(url)) = (created, task.repository_url()) {
            out.log(format!("Cloning {url}...")).await?;
            sandbox.git_clone(url).await.map_err(fatal)?;
            out.log("Repository cloned").await?;
        }

        Ok(sandbox)
    }

    async fn execute_tool(
        &self,
        call: &ToolCallPlan,
        sandbox: &SandboxClient,
        history: &mut ConversationHistory,
        out: &Emitter,
    ) -> Result<(), Stop> {
        let name = call.name();
        let input = serde_json::Value::Object(call.args());
        debug!(tool = %name, "Executing tool");

        match self.tools.dispatch(call, sandbox).await {
            Ok(output) => {
                out.emit(ToolEvent::Tool {
                    name: name.to_string(),
                    input,
                    output: Some(truncate(&output, EVENT_OUTPUT_LIMIT).to_string()),
                })
                .await?;
                history.push(Message::user(format!(
                    "Tool {name} output:\n{}",
                    truncate(&output, HISTORY_OUTPUT_LIMIT)
                )));
                Ok(())
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool failed");
                history.push(Message::user(format!("Tool {name} error: {e}")));
                out.emit(ToolEvent::Tool {
                    name: name.to_string(),
                    input,
                    output: None,
                })
                .await?;
                Err(fatal(e))
            }
        }
    }
}

/// The first `max` characters of `text`.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Resolves every model id to the same client.
///
/// Handy when the caller already holds a client, e.g. in tests or when a
/// single model is pinned.
pub struct SingleModel(pub Arc<dyn ModelClient>);

impl ModelResolver for SingleModel {
    fn resolve(&self, _model_id: &str) -> Result<Arc<dyn ModelClient>, codeflow_core::ModelError> {
        Ok(self.0.clone())
    }
}
