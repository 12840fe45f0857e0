//! Local sandbox backend: host directories and `sh -c`.
//!
//! Each sandbox is a directory `<base>/<id>/workspace` on the host and
//! commands run as the current user. There is no isolation; this backend
//! exists for development and offline use.

use async_trait::async_trait;
use codeflow_core::SandboxError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::backend::{ExecOutput, SandboxBackend, SandboxProvider};

/// Hands out sandboxes as subdirectories of a base directory.
pub struct LocalSandboxProvider {
    base_dir: PathBuf,
    timeout: Duration,
}

impl LocalSandboxProvider {
    /// A relative `base_dir` is resolved against the current directory;
    /// sandbox commands run with other working directories.
    pub fn new(base_dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        let base_dir = base_dir.into();
        Self {
            base_dir: std::path::absolute(&base_dir).unwrap_or(base_dir),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn workspace_dir(&self, id: &str) -> PathBuf {
        self.base_dir.join(id).join("workspace")
    }

    fn sandbox(&self, id: String, root: &Path) -> Box<dyn SandboxBackend> {
        Box::new(LocalSandbox {
            id,
            root: root.to_string_lossy().into_owned(),
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl SandboxProvider for LocalSandboxProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn create(&self) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let root = self.workspace_dir(&id);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| SandboxError::Io(format!("{}: {e}", root.display())))?;
        debug!(sandbox_id = %id, root = %root.display(), "Created local sandbox");
        Ok(self.sandbox(id, &root))
    }

    async fn connect(&self, id: &str) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        // ids are directory names; anything that could escape the base is unknown
        if id.is_empty() || id.contains('/') || id.contains("..") {
            return Err(SandboxError::NotFound(id.to_string()));
        }
        let root = self.workspace_dir(id);
        if !root.is_dir() {
            return Err(SandboxError::NotFound(id.to_string()));
        }
        Ok(self.sandbox(id.to_string(), &root))
    }
}

pub struct LocalSandbox {
    id: String,
    root: String,
    timeout: Duration,
}

fn io_error(path: &str, e: std::io::Error) -> SandboxError {
    if e.kind() == std::io::ErrorKind::NotFound {
        SandboxError::FileNotFound(path.to_string())
    } else {
        SandboxError::Io(format!("{path}: {e}"))
    }
}

#[async_trait]
impl SandboxBackend for LocalSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn workspace_root(&self) -> &str {
        &self.root
    }

    async fn exec(&self, cmd: &str, cwd: &str) -> Result<ExecOutput, SandboxError> {
        debug!(cmd = %cmd, cwd = %cwd, "Local exec");

        let child = Command::new("sh")
            .args(["-c", cmd])
            .current_dir(cwd)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| SandboxError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| SandboxError::Io(format!("failed to spawn in {cwd}: {e}")))?;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!(cmd = %cmd, exit_code, "Command exited non-zero");
        }

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn kill(&self) -> Result<(), SandboxError> {
        // The workspace is left on disk so the run can be inspected or resumed.
        Ok(())
    }
}
