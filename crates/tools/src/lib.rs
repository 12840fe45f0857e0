//! Built-in tools for codeflow.
//!
//! Each tool maps one model-issued call onto one [`SandboxClient`]
//! operation:
//!
//! | Tool             | Arguments                         |
//! |------------------|-----------------------------------|
//! | `cmd.run`        | `{ cmd: string, cwd?: string }`   |
//! | `fs.read`        | `{ path: string }`                |
//! | `fs.write`       | `{ path: string, content: string }` |
//! | `pkg.install`    | `{ pkgs: string[] }`              |
//! | `edit.fastApply` | `{ path: string, patch: string }` |

pub mod args;
pub mod fast_apply;
pub mod file_read;
pub mod file_write;
pub mod package_install;
pub mod shell;

use async_trait::async_trait;
use codeflow_core::{ToolArgs, ToolCallPlan, ToolError, ToolShape};
use codeflow_sandbox::SandboxClient;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A capability the model can invoke inside the sandbox.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "cmd.run").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// Argument shape, used only to prompt the model.
    fn shape(&self) -> ToolShape;

    /// Execute against the sandbox. Output is always text.
    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError>;
}

/// Maps tool names to tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    /// Registration order, so the prompt catalog is stable.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The five built-in tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(shell::CommandRunTool));
        registry.register(Box::new(file_read::FileReadTool));
        registry.register(Box::new(file_write::FileWriteTool));
        registry.register(Box::new(package_install::PackageInstallTool));
        registry.register(Box::new(fast_apply::FastApplyTool));
        registry
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Shapes of all tools, in registration order.
    pub fn shapes(&self) -> Vec<ToolShape> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.shape())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Execute the model's chosen tool.
    ///
    /// An unknown or unparsed tool is not an error: the result is the text
    /// `Unknown tool: <name>` so the model can correct itself.
    pub async fn dispatch(
        &self,
        plan: &ToolCallPlan,
        sandbox: &SandboxClient,
    ) -> Result<String, ToolError> {
        let ToolCallPlan::Parsed { name, args } = plan else {
            warn!("Model reply was not a tool call");
            return Ok(unknown_tool(plan.name()));
        };

        match self.tools.get(name) {
            Some(tool) => {
                debug!(tool = %name, "Dispatching tool");
                tool.execute(sandbox, args).await
            }
            None => {
                warn!(tool = %name, "Unknown tool requested");
                Ok(unknown_tool(name))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn unknown_tool(name: &str) -> String {
    format!("Unknown tool: {name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeflow_core::{ParamKind, ParamShape};
    use codeflow_sandbox::MemorySandbox;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn shape(&self) -> ToolShape {
            ToolShape {
                name: "echo".into(),
                description: self.description().into(),
                params: vec![ParamShape::required("text", ParamKind::String)],
            }
        }
        async fn execute(&self, _: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
            Ok(args::required_str(args, "echo", "text")?.to_string())
        }
    }

    fn sandbox() -> SandboxClient {
        SandboxClient::new(Box::new(MemorySandbox::new("m", "/home/user/workspace")))
    }

    #[test]
    fn builtin_registry_has_five_tools_in_order() {
        let registry = ToolRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["cmd.run", "fs.read", "fs.write", "pkg.install", "edit.fastApply"]
        );
        let shapes = registry.shapes();
        assert_eq!(shapes[0].signature(), "cmd.run { cmd: string, cwd?: string }");
        assert_eq!(shapes[3].signature(), "pkg.install { pkgs: string[] }");
    }

    #[test]
    fn register_replaces_without_duplicating() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry.register(Box::new(EchoTool));
        assert_eq!(registry.names(), vec!["echo"]);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn dispatch_executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let plan = ToolCallPlan::parsed("echo", json!({"text": "hello world"}));
        let out = registry.dispatch(&plan, &sandbox()).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn unknown_and_unparsed_tools_are_reported_not_raised() {
        let registry = ToolRegistry::builtin();

        let plan = ToolCallPlan::parsed("deploy.prod", json!({}));
        assert_eq!(
            registry.dispatch(&plan, &sandbox()).await.unwrap(),
            "Unknown tool: deploy.prod"
        );

        let plan = ToolCallPlan::from_model_output("no json here");
        assert_eq!(
            registry.dispatch(&plan, &sandbox()).await.unwrap(),
            "Unknown tool: (unparsed)"
        );
    }

    #[tokio::test]
    async fn missing_arguments_are_errors() {
        let registry = ToolRegistry::builtin();
        let plan = ToolCallPlan::parsed("fs.read", json!({}));
        let err = registry.dispatch(&plan, &sandbox()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
