//! Backend traits: the seam between codeflow and whatever actually runs
//! commands (a remote sandbox service, a host directory, an in-memory map).

use async_trait::async_trait;
use codeflow_core::SandboxError;
use serde::{Deserialize, Serialize};

use crate::shell;

/// Result of one command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout if non-empty, else stderr.
    pub fn primary_output(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    /// stderr if non-empty, else stdout. Used for failure messages.
    pub fn failure_output(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// A live sandbox handle.
///
/// Paths passed in are already absolute and resolved against
/// [`workspace_root`](Self::workspace_root); backends do not normalize.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Backend-assigned identifier, usable with [`SandboxProvider::connect`].
    fn id(&self) -> &str;

    /// Absolute path of the workspace directory inside the sandbox.
    fn workspace_root(&self) -> &str;

    /// Run `cmd` through a shell in `cwd`. A non-zero exit is not an error here.
    async fn exec(&self, cmd: &str, cwd: &str) -> Result<ExecOutput, SandboxError>;

    async fn read_file(&self, path: &str) -> Result<String, SandboxError>;

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError>;

    /// Whether [`apply_patch`](Self::apply_patch) is usable on this backend.
    fn supports_patch(&self) -> bool {
        true
    }

    /// Apply a unified diff in `cwd`.
    ///
    /// The default writes the patch to a temp file and tries `git apply`,
    /// then `patch`. A non-zero exit means the patch did not apply.
    async fn apply_patch(&self, patch: &str, cwd: &str) -> Result<ExecOutput, SandboxError> {
        let tmp = format!("/tmp/codeflow-{}.patch", uuid::Uuid::new_v4());
        self.write_file(&tmp, patch).await?;
        let quoted = shell::quote(&tmp)?;

        let mut output = self
            .exec(&format!("git apply --whitespace=nowarn {quoted}"), cwd)
            .await?;
        if !output.success() {
            tracing::debug!(stderr = %output.stderr, "git apply failed, trying patch");
            let strip = strip_level(patch);
            output = self
                .exec(&format!("patch -p{strip} -u -i {quoted}"), cwd)
                .await?;
        }

        if let Err(e) = self.exec(&format!("rm -f {quoted}"), cwd).await {
            tracing::debug!(error = %e, "Failed to remove temp patch file");
        }
        Ok(output)
    }

    /// Release the sandbox. Backends without remote state do nothing.
    async fn kill(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}

/// Creates new sandboxes or reattaches to existing ones.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Short backend name for logs (e.g., "remote", "local").
    fn name(&self) -> &str;

    async fn create(&self) -> Result<Box<dyn SandboxBackend>, SandboxError>;

    async fn connect(&self, id: &str) -> Result<Box<dyn SandboxBackend>, SandboxError>;
}

/// `-p1` for `a/`/`b/`-prefixed git-style headers, `-p0` otherwise.
fn strip_level(patch: &str) -> u8 {
    let git_style = patch
        .lines()
        .any(|l| l.starts_with("+++ b/") || l.starts_with("--- a/"));
    if git_style { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_preference() {
        let out = ExecOutput {
            stdout: String::new(),
            stderr: "warning".into(),
            exit_code: 0,
        };
        assert_eq!(out.primary_output(), "warning");

        let out = ExecOutput {
            stdout: "partial".into(),
            stderr: String::new(),
            exit_code: 1,
        };
        assert_eq!(out.failure_output(), "partial");
        assert!(!out.success());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let out: ExecOutput =
            serde_json::from_str(r#"{"stdout":"x","stderr":"","exitCode":3}"#).unwrap();
        assert_eq!(out.exit_code, 3);
    }

    #[test]
    fn patch_strip_level() {
        assert_eq!(strip_level("--- a/x\n+++ b/x\n"), 1);
        assert_eq!(strip_level("--- x.orig\n+++ x\n"), 0);
    }
}
