//! `cmd.run`: run a shell command in the sandbox.

use async_trait::async_trait;
use codeflow_core::{ParamKind, ParamShape, ToolArgs, ToolError, ToolShape};
use codeflow_sandbox::SandboxClient;

use crate::Tool;
use crate::args;

/// Runs a command; a non-zero exit is a tool error.
pub struct CommandRunTool;

#[async_trait]
impl Tool for CommandRunTool {
    fn name(&self) -> &str {
        "cmd.run"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace (or in cwd). Fails on non-zero exit."
    }

    fn shape(&self) -> ToolShape {
        ToolShape {
            name: self.name().into(),
            description: self.description().into(),
            params: vec![
                ParamShape::required("cmd", ParamKind::String),
                ParamShape::optional("cwd", ParamKind::String),
            ],
        }
    }

    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
        let cmd = args::required_str(args, self.name(), "cmd")?;
        let cwd = args::optional_str(args, self.name(), "cwd")?;

        let out = sandbox.run(cmd, cwd).await?;
        Ok(out.primary_output().to_string())
    }
}
