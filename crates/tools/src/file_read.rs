//! `fs.read`: read a file from the workspace.

use async_trait::async_trait;
use codeflow_core::{ParamKind, ParamShape, ToolArgs, ToolError, ToolShape};
use codeflow_sandbox::SandboxClient;

use crate::Tool;
use crate::args;

pub struct FileReadTool;

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "fs.read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Paths are relative to the workspace."
    }

    fn shape(&self) -> ToolShape {
        ToolShape {
            name: self.name().into(),
            description: self.description().into(),
            params: vec![ParamShape::required("path", ParamKind::String)],
        }
    }

    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
        let path = args::required_str(args, self.name(), "path")?;
        Ok(sandbox.read_file(path).await?)
    }
}
