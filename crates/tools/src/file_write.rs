//! `fs.write`: create or overwrite a file.

use async_trait::async_trait;
use codeflow_core::{ParamKind, ParamShape, ToolArgs, ToolError, ToolShape};
use codeflow_sandbox::SandboxClient;
use tracing::debug;

use crate::Tool;
use crate::args;

pub struct FileWriteTool;

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "fs.write"
    }

    fn description(&self) -> &str {
        "Write full content to a file, creating parent directories as needed."
    }

    fn shape(&self) -> ToolShape {
        ToolShape {
            name: self.name().into(),
            description: self.description().into(),
            params: vec![
                ParamShape::required("path", ParamKind::String),
                ParamShape::required("content", ParamKind::String),
            ],
        }
    }

    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
        let path = args::required_str(args, self.name(), "path")?;
        let content = args::required_str(args, self.name(), "content")?;

        debug!(path = %path, bytes = content.len(), "Writing file");
        sandbox.write_file(path, content).await?;
        Ok("OK".into())
    }
}
