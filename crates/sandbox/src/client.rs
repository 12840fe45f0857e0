//! The sandbox client the tools talk to.
//!
//! Wraps a backend and adds what every backend needs the same way:
//! path normalization against the workspace root, failure-raising command
//! execution, parent-directory creation on write, package installs, and
//! repository cloning.

use codeflow_core::SandboxError;
use tracing::{debug, info, warn};

use crate::backend::{ExecOutput, SandboxBackend};
use crate::path;
use crate::shell;

/// Shell prelude that activates pnpm through corepack. Failures are ignored;
/// a sandbox image with pnpm preinstalled needs none of it.
const PNPM_PRELUDE: &str = "corepack enable >/dev/null 2>&1 || true; \
     corepack prepare pnpm@latest --activate >/dev/null 2>&1 || true";

pub struct SandboxClient {
    backend: Box<dyn SandboxBackend>,
}

impl SandboxClient {
    pub fn new(backend: Box<dyn SandboxBackend>) -> Self {
        Self { backend }
    }

    pub fn id(&self) -> &str {
        self.backend.id()
    }

    pub fn workspace_root(&self) -> &str {
        self.backend.workspace_root()
    }

    /// Resolve a model-supplied path against the workspace root.
    pub fn resolve(&self, path: &str) -> String {
        path::normalize(path, self.workspace_root())
    }

    pub fn supports_patch(&self) -> bool {
        self.backend.supports_patch()
    }

    /// Make sure the workspace directory exists.
    pub async fn ensure_workspace(&self) -> Result<(), SandboxError> {
        let root = shell::quote(self.workspace_root())?;
        let out = self.backend.exec(&format!("mkdir -p {root}"), "/").await?;
        if !out.success() {
            return Err(SandboxError::CommandFailed {
                exit_code: out.exit_code,
                output: out.failure_output().to_string(),
            });
        }
        Ok(())
    }

    /// Run a shell command. `cwd` defaults to the workspace root.
    ///
    /// A non-zero exit is an error carrying stderr (or stdout if stderr is
    /// empty).
    pub async fn run(&self, cmd: &str, cwd: Option<&str>) -> Result<ExecOutput, SandboxError> {
        let cwd = self.resolve(cwd.unwrap_or(""));
        debug!(sandbox_id = %self.id(), cmd = %cmd, cwd = %cwd, "Running command");

        let out = self.backend.exec(cmd, &cwd).await?;
        if !out.success() {
            return Err(SandboxError::CommandFailed {
                exit_code: out.exit_code,
                output: out.failure_output().to_string(),
            });
        }
        Ok(out)
    }

    pub async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        let path = self.resolve(path);
        self.backend.read_file(&path).await
    }

    /// Write a file, creating its parent directory first.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let path = self.resolve(path);
        let parent = shell::quote(path::parent_dir(&path))?;

        match self.backend.exec(&format!("mkdir -p {parent}"), "/").await {
            Ok(out) if !out.success() => {
                warn!(path = %path, stderr = %out.stderr, "mkdir before write failed");
            }
            Err(e) => warn!(path = %path, error = %e, "mkdir before write failed"),
            Ok(_) => {}
        }

        self.backend.write_file(&path, content).await
    }

    /// Install dev dependencies with pnpm.
    ///
    /// Never fails on a non-zero exit: the combined stdout and stderr come
    /// back as the result so the model can read what went wrong.
    pub async fn install_packages(&self, packages: &[String]) -> Result<String, SandboxError> {
        let names = shell::join(packages.iter().map(String::as_str))?;
        let cmd = format!("{PNPM_PRELUDE}; pnpm add -D {names}");
        let root = self.workspace_root().to_string();

        info!(sandbox_id = %self.id(), packages = %names, "Installing packages");
        let out = self.backend.exec(&cmd, &root).await?;
        if !out.success() {
            warn!(exit_code = out.exit_code, "pnpm add exited non-zero");
        }
        Ok(format!("{}{}", out.stdout, out.stderr))
    }

    /// Apply a unified diff. A non-zero exit in the result means it did not apply.
    pub async fn apply_patch(
        &self,
        patch: &str,
        cwd: Option<&str>,
    ) -> Result<ExecOutput, SandboxError> {
        let cwd = self.resolve(cwd.unwrap_or(""));
        self.backend.apply_patch(patch, &cwd).await
    }

    /// Replace the workspace contents with a fresh clone of `url`.
    pub async fn git_clone(&self, url: &str) -> Result<ExecOutput, SandboxError> {
        self.ensure_workspace().await?;
        self.run("find . -mindepth 1 -delete", None).await?;
        let url = shell::quote(url)?;
        info!(sandbox_id = %self.id(), "Cloning repository");
        self.run(&format!("git clone -- {url} ."), None).await
    }

    pub async fn kill(&self) -> Result<(), SandboxError> {
        self.backend.kill().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySandbox;

    const ROOT: &str = "/home/user/workspace";

    fn client(sandbox: &MemorySandbox) -> SandboxClient {
        SandboxClient::new(Box::new(sandbox.clone()))
    }

    #[tokio::test]
    async fn run_raises_on_failure_with_stderr() {
        let sandbox = MemorySandbox::new("m", ROOT).with_handler(|cmd, _| match cmd {
            "false" => ExecOutput::failed(1, "boom"),
            "quiet-fail" => ExecOutput {
                stdout: "only stdout".into(),
                stderr: String::new(),
                exit_code: 4,
            },
            _ => ExecOutput::ok("fine"),
        });
        let client = client(&sandbox);

        assert_eq!(client.run("true", None).await.unwrap().stdout, "fine");

        let err = client.run("false", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Command failed (exit 1): boom");

        let err = client.run("quiet-fail", None).await.unwrap_err();
        assert!(matches!(
            err,
            SandboxError::CommandFailed { exit_code: 4, ref output } if output == "only stdout"
        ));
    }

    #[tokio::test]
    async fn run_resolves_cwd() {
        let sandbox = MemorySandbox::new("m", ROOT).with_handler(|_, cwd| ExecOutput::ok(cwd));
        let client = client(&sandbox);

        assert_eq!(client.run("pwd", None).await.unwrap().stdout, ROOT);
        assert_eq!(
            client.run("pwd", Some("./pkg")).await.unwrap().stdout,
            "/home/user/workspace/pkg"
        );
    }

    #[tokio::test]
    async fn file_paths_are_normalized() {
        let sandbox = MemorySandbox::new("m", ROOT);
        let client = client(&sandbox);

        client.write_file("/src/a.ts", "x").await.unwrap();
        assert_eq!(sandbox.file("src/a.ts").unwrap(), "x");
        assert_eq!(client.read_file("./src/a.ts").await.unwrap(), "x");
        let mkdir = format!(
            "mkdir -p {}",
            shell::quote("/home/user/workspace/src").unwrap()
        );
        assert!(sandbox.commands().contains(&mkdir));
    }

    #[tokio::test]
    async fn install_never_raises() {
        let sandbox = MemorySandbox::new("m", ROOT).with_handler(|_, _| ExecOutput {
            stdout: "progress\n".into(),
            stderr: "ERR_PNPM_FETCH_404".into(),
            exit_code: 1,
        });
        let client = client(&sandbox);

        let out = client
            .install_packages(&["vitest".into(), "@types/node".into()])
            .await
            .unwrap();
        assert_eq!(out, "progress\nERR_PNPM_FETCH_404");

        let cmd = sandbox.commands().pop().unwrap();
        assert!(cmd.contains("corepack enable"));
        let names = shell::join(["vitest", "@types/node"]).unwrap();
        assert!(cmd.ends_with(&format!("pnpm add -D {names}")));
    }

    #[tokio::test]
    async fn clone_empties_workspace_first() {
        let sandbox = MemorySandbox::new("m", ROOT);
        let client = client(&sandbox);

        client
            .git_clone("https://example.com/repo.git")
            .await
            .unwrap();

        let commands = sandbox.commands();
        let clear = commands
            .iter()
            .position(|c| c.starts_with("find . -mindepth 1"))
            .unwrap();
        let clone = commands
            .iter()
            .position(|c| c.starts_with("git clone"))
            .unwrap();
        assert!(clear < clone);
        let url = shell::quote("https://example.com/repo.git").unwrap();
        assert_eq!(commands[clone], format!("git clone -- {url} ."));
    }
}
