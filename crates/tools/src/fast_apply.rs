//! `edit.fastApply`: update a file from a diff or its full new content.

use async_trait::async_trait;
use codeflow_core::{ParamKind, ParamShape, ToolArgs, ToolError, ToolShape};
use codeflow_sandbox::{PatchApplier, SandboxClient};
use tracing::info;

use crate::Tool;
use crate::args;

pub struct FastApplyTool;

#[async_trait]
impl Tool for FastApplyTool {
    fn name(&self) -> &str {
        "edit.fastApply"
    }

    fn description(&self) -> &str {
        "Edit a file. `patch` may be a unified diff or the complete new file content."
    }

    fn shape(&self) -> ToolShape {
        ToolShape {
            name: self.name().into(),
            description: self.description().into(),
            params: vec![
                ParamShape::required("path", ParamKind::String),
                ParamShape::required("patch", ParamKind::String),
            ],
        }
    }

    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
        let path = args::required_str(args, self.name(), "path")?;
        let patch = args::required_str(args, self.name(), "patch")?;

        let outcome = PatchApplier::new(sandbox).apply(path, patch).await?;
        info!(path = %path, outcome = ?outcome, "Fast-apply finished");
        Ok(outcome.message().to_string())
    }
}
