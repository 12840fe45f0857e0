//! `codeflow run`: run a single task and print its events.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use codeflow_agent::{AgentSettings, EventStream, Orchestrator};
use codeflow_config::AppConfig;
use codeflow_core::{Task, ToolEvent};
use codeflow_providers::ModelRouter;
use futures::StreamExt;

/// Lines of tool output shown in human-readable mode.
const PREVIEW_LINES: usize = 12;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// What the agent should do
    pub task: String,

    /// Model id as `provider:model` (defaults to the configured model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Repository to clone into a new sandbox
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Reuse an existing sandbox instead of creating one
    #[arg(short, long)]
    pub sandbox: Option<String>,

    /// Upper bound on loop iterations
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let mut settings = AgentSettings::from_config(&config);
    if let Some(max_steps) = args.max_steps {
        if max_steps == 0 {
            return Err("--max-steps must be at least 1".into());
        }
        settings.max_steps = max_steps;
    }

    let orchestrator = Orchestrator::new(
        Arc::new(ModelRouter::from_config(&config)),
        codeflow_sandbox::build_from_config(&config),
        settings,
    );

    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    let mut task = Task::new(args.task, model);
    if let Some(url) = args.repo {
        task = task.with_repository(url);
    }
    if let Some(id) = args.sandbox {
        task = task.with_existing_sandbox(id);
    }

    let stdout = std::io::stdout();
    let failed = print_events(orchestrator.run(task), args.json, &mut stdout.lock()).await?;
    if failed {
        return Err("Run ended with an error".into());
    }

    Ok(())
}

/// Print every event; returns whether the run ended in `error`.
async fn print_events(
    mut events: EventStream,
    json: bool,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    let mut failed = false;

    while let Some(event) = events.next().await {
        failed |= matches!(event, ToolEvent::Error { .. });
        let line = if json {
            serde_json::to_string(&event).map_err(std::io::Error::other)?
        } else {
            render(&event)
        };
        writeln!(out, "{line}")?;
        out.flush()?;
    }

    Ok(failed)
}

/// One event in human-readable form.
fn render(event: &ToolEvent) -> String {
    match event {
        ToolEvent::Plan { content } => format!("📝 {content}"),
        ToolEvent::Tool {
            name,
            input,
            output,
        } => {
            let mut text = format!("🔧 {name} {input}");
            match output {
                Some(output) if !output.is_empty() => {
                    for line in output.lines().take(PREVIEW_LINES) {
                        text.push_str("\n   │ ");
                        text.push_str(line);
                    }
                    let hidden = output.lines().count().saturating_sub(PREVIEW_LINES);
                    if hidden > 0 {
                        text.push_str(&format!("\n   │ … {hidden} more lines"));
                    }
                }
                Some(_) => {}
                None => text.push_str("\n   │ (failed)"),
            }
            text
        }
        ToolEvent::Log { content } => format!("   {content}"),
        ToolEvent::Done { summary } => format!("✅ {summary}"),
        ToolEvent::Error { error } => format!("❌ {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeflow_agent::SingleModel;
    use codeflow_core::{Completion, Message, ModelClient, ModelError, ToolCallPlan, ToolShape};
    use codeflow_sandbox::MemorySandboxProvider;
    use serde_json::json;

    struct DoneModel;

    #[async_trait::async_trait]
    impl ModelClient for DoneModel {
        fn name(&self) -> &str {
            "done"
        }

        async fn complete(&self, _messages: &[Message]) -> Result<Completion, ModelError> {
            Ok(Completion::text("DONE: nothing to do"))
        }

        async fn plan_tool(
            &self,
            _messages: &[Message],
            _tools: &[ToolShape],
        ) -> Result<ToolCallPlan, ModelError> {
            Ok(ToolCallPlan::parsed("cmd.run", json!({"cmd": "ls"})))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(SingleModel(Arc::new(DoneModel))),
            Arc::new(MemorySandboxProvider::new("/home/user/workspace")),
            AgentSettings::default(),
        )
    }

    #[test]
    fn renders_each_event_kind() {
        assert_eq!(render(&ToolEvent::plan("look around")), "📝 look around");
        assert_eq!(render(&ToolEvent::log("Creating sandbox...")), "   Creating sandbox...");
        assert_eq!(render(&ToolEvent::done("DONE: ok")), "✅ DONE: ok");
        assert_eq!(render(&ToolEvent::error("boom")), "❌ boom");

        let tool = ToolEvent::Tool {
            name: "cmd.run".into(),
            input: json!({"cmd": "ls"}),
            output: Some("a\nb".into()),
        };
        assert_eq!(
            render(&tool),
            "🔧 cmd.run {\"cmd\":\"ls\"}\n   │ a\n   │ b"
        );
    }

    #[test]
    fn long_tool_output_is_previewed() {
        let output = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let tool = ToolEvent::Tool {
            name: "fs.read".into(),
            input: json!({"path": "x"}),
            output: Some(output),
        };
        let text = render(&tool);
        assert!(text.ends_with("… 8 more lines"));
        assert!(!text.contains("│ 12\n"));
    }

    #[test]
    fn failed_tool_is_marked() {
        let tool = ToolEvent::Tool {
            name: "cmd.run".into(),
            input: json!({}),
            output: None,
        };
        assert!(render(&tool).ends_with("(failed)"));
    }

    #[tokio::test]
    async fn json_mode_prints_one_event_per_line() {
        let mut out = Vec::new();
        let failed = print_events(orchestrator().run(Task::new("x", "m:m")), true, &mut out)
            .await
            .unwrap();

        assert!(!failed);
        let text = String::from_utf8(out).unwrap();
        let events: Vec<ToolEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.last(), Some(&ToolEvent::done("DONE: nothing to do")));
        assert!(events.iter().any(|e| e.event_type() == "tool"));
    }

    #[tokio::test]
    async fn error_run_is_reported_as_failed() {
        let mut out = Vec::new();
        let task = Task::new("x", "m:m").with_existing_sandbox("sbx-missing");
        let failed = print_events(orchestrator().run(task), false, &mut out)
            .await
            .unwrap();

        assert!(failed);
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("❌ Sandbox not found: sbx-missing\n"));
    }
}
