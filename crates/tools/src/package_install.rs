//! `pkg.install`: add dev dependencies with pnpm.

use async_trait::async_trait;
use codeflow_core::{ParamKind, ParamShape, ToolArgs, ToolError, ToolShape};
use codeflow_sandbox::SandboxClient;

use crate::Tool;
use crate::args;

/// Installs packages. A failed install is reported in the output, not raised.
pub struct PackageInstallTool;

#[async_trait]
impl Tool for PackageInstallTool {
    fn name(&self) -> &str {
        "pkg.install"
    }

    fn description(&self) -> &str {
        "Install Node.js dev dependencies with pnpm (never npm or yarn)."
    }

    fn shape(&self) -> ToolShape {
        ToolShape {
            name: self.name().into(),
            description: self.description().into(),
            params: vec![ParamShape::required("pkgs", ParamKind::StringList)],
        }
    }

    async fn execute(&self, sandbox: &SandboxClient, args: &ToolArgs) -> Result<String, ToolError> {
        let pkgs = args::string_list(args, self.name(), "pkgs")?;
        if pkgs.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool_name: self.name().into(),
                reason: "'pkgs' must name at least one package".into(),
            });
        }
        Ok(sandbox.install_packages(&pkgs).await?)
    }
}
