//! In-memory sandbox backend.
//!
//! Files live in a map; patches are applied natively with `diffy`.
//! Commands are answered by an optional scripted handler and recorded so
//! tests can assert on them. Used for dry runs and as the test double for
//! everything above the backend seam.

use async_trait::async_trait;
use codeflow_core::SandboxError;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{ExecOutput, SandboxBackend, SandboxProvider};
use crate::path;

/// Scripted answer to a command: `(cmd, cwd) -> output`.
pub type CommandHandler = Arc<dyn Fn(&str, &str) -> ExecOutput + Send + Sync>;

#[derive(Default)]
struct State {
    files: BTreeMap<String, String>,
    commands: Vec<String>,
    patches: Vec<String>,
}

/// A sandbox backed by a shared file map. Clones share state.
#[derive(Clone)]
pub struct MemorySandbox {
    id: String,
    root: String,
    patch_support: bool,
    handler: Option<CommandHandler>,
    state: Arc<Mutex<State>>,
}

impl MemorySandbox {
    pub fn new(id: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            patch_support: true,
            handler: None,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Answer commands with `handler` instead of a bare success.
    pub fn with_handler(
        mut self,
        handler: impl Fn(&str, &str) -> ExecOutput + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Report `supports_patch() == false`.
    pub fn without_patch(mut self) -> Self {
        self.patch_support = false;
        self
    }

    /// Seed a file; relative paths resolve against the workspace root.
    pub fn with_file(self, file: &str, content: &str) -> Self {
        let key = path::normalize(file, &self.root);
        self.lock().files.insert(key, content.to_string());
        self
    }

    /// Current content of a file, if present.
    pub fn file(&self, file: &str) -> Option<String> {
        let key = path::normalize(file, &self.root);
        self.lock().files.get(&key).cloned()
    }

    /// Every command passed to `exec`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Every patch passed to `apply_patch`, in order.
    pub fn patches(&self) -> Vec<String> {
        self.lock().patches.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Target of a single-file unified diff, from its `+++` (or `---`) header.
fn patch_target<'p>(patch: &'p diffy::Patch<'_, str>) -> Option<&'p str> {
    let pick = |name: Option<&'p str>| {
        name.map(|n| n.split('\t').next().unwrap_or(n).trim())
            .filter(|n| !n.is_empty() && *n != "/dev/null")
    };
    let name = pick(patch.modified()).or_else(|| pick(patch.original()))?;
    Some(
        name.strip_prefix("b/")
            .or_else(|| name.strip_prefix("a/"))
            .unwrap_or(name),
    )
}

#[async_trait]
impl SandboxBackend for MemorySandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn workspace_root(&self) -> &str {
        &self.root
    }

    async fn exec(&self, cmd: &str, cwd: &str) -> Result<ExecOutput, SandboxError> {
        self.lock().commands.push(cmd.to_string());
        Ok(match &self.handler {
            Some(handler) => handler(cmd, cwd),
            None => ExecOutput::default(),
        })
    }

    async fn read_file(&self, file: &str) -> Result<String, SandboxError> {
        self.lock()
            .files
            .get(file)
            .cloned()
            .ok_or_else(|| SandboxError::FileNotFound(file.to_string()))
    }

    async fn write_file(&self, file: &str, content: &str) -> Result<(), SandboxError> {
        self.lock()
            .files
            .insert(file.to_string(), content.to_string());
        Ok(())
    }

    fn supports_patch(&self) -> bool {
        self.patch_support
    }

    async fn apply_patch(&self, patch: &str, cwd: &str) -> Result<ExecOutput, SandboxError> {
        let mut state = self.lock();
        state.patches.push(patch.to_string());

        let parsed = match diffy::Patch::from_str(patch) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ExecOutput::failed(1, format!("error: corrupt patch: {e}"))),
        };
        let Some(target) = patch_target(&parsed) else {
            return Ok(ExecOutput::failed(1, "error: patch names no target file"));
        };

        let file = path::normalize(target, cwd);
        let base = state.files.get(&file).cloned().unwrap_or_default();
        match diffy::apply(&base, &parsed) {
            Ok(updated) => {
                state.files.insert(file.clone(), updated);
                Ok(ExecOutput::ok(format!("patching file {target}\n")))
            }
            Err(e) => Ok(ExecOutput::failed(
                1,
                format!("error: patch failed: {target}: {e}"),
            )),
        }
    }
}

/// Keeps memory sandboxes by id so `connect` finds what `create` made.
pub struct MemorySandboxProvider {
    root: String,
    next_id: AtomicU64,
    sandboxes: Mutex<HashMap<String, MemorySandbox>>,
}

impl MemorySandboxProvider {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            next_id: AtomicU64::new(1),
            sandboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Register a pre-built sandbox, reachable through `connect(sandbox.id())`.
    pub fn insert(&self, sandbox: MemorySandbox) {
        self.sandboxes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(sandbox.id.clone(), sandbox);
    }

    /// A handle onto an existing sandbox's shared state.
    pub fn get(&self, id: &str) -> Option<MemorySandbox> {
        self.sandboxes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl SandboxProvider for MemorySandboxProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let sandbox = MemorySandbox::new(id, self.root.clone());
        self.insert(sandbox.clone());
        Ok(Box::new(sandbox))
    }

    async fn connect(&self, id: &str) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        self.get(id)
            .map(|s| Box::new(s) as Box<dyn SandboxBackend>)
            .ok_or_else(|| SandboxError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/home/user/workspace";

    #[tokio::test]
    async fn applies_git_style_diff() {
        let sandbox = MemorySandbox::new("m", ROOT).with_file("a.txt", "one\ntwo\n");
        let patch = "--- a/a.txt\n+++ b/a.txt\n@@ -1,2 +1,2 @@\n one\n-two\n+three\n";

        let out = sandbox.apply_patch(patch, ROOT).await.unwrap();
        assert!(out.success(), "{}", out.stderr);
        assert_eq!(sandbox.file("a.txt").unwrap(), "one\nthree\n");
        assert_eq!(sandbox.patches().len(), 1);
    }

    #[tokio::test]
    async fn creates_file_from_dev_null() {
        let sandbox = MemorySandbox::new("m", ROOT);
        let patch = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1 @@\n+hello\n";

        let out = sandbox.apply_patch(patch, ROOT).await.unwrap();
        assert!(out.success(), "{}", out.stderr);
        assert_eq!(sandbox.file("new.txt").unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn mismatched_context_fails_without_writing() {
        let sandbox = MemorySandbox::new("m", ROOT).with_file("a.txt", "different\n");
        let patch = "--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-original\n+changed\n";

        let out = sandbox.apply_patch(patch, ROOT).await.unwrap();
        assert!(!out.success());
        assert_eq!(sandbox.file("a.txt").unwrap(), "different\n");
    }

    #[tokio::test]
    async fn garbage_patch_fails() {
        let sandbox = MemorySandbox::new("m", ROOT);
        let out = sandbox.apply_patch("not a patch", ROOT).await.unwrap();
        assert!(!out.success());
    }

    #[tokio::test]
    async fn scripted_commands_are_recorded() {
        let sandbox = MemorySandbox::new("m", ROOT).with_handler(|cmd, _| {
            if cmd == "ls" {
                ExecOutput::ok("a.txt\n")
            } else {
                ExecOutput::failed(127, "not found")
            }
        });

        assert_eq!(sandbox.exec("ls", ROOT).await.unwrap().stdout, "a.txt\n");
        assert_eq!(sandbox.exec("make", ROOT).await.unwrap().exit_code, 127);
        assert_eq!(sandbox.commands(), vec!["ls", "make"]);
    }

    #[tokio::test]
    async fn provider_reconnects_to_created_sandbox() {
        let provider = MemorySandboxProvider::new(ROOT);
        let created = provider.create().await.unwrap();
        created
            .write_file("/home/user/workspace/x", "1")
            .await
            .unwrap();

        let again = provider.connect(created.id()).await.unwrap();
        assert_eq!(again.read_file("/home/user/workspace/x").await.unwrap(), "1");
        assert!(matches!(
            provider.connect("mem-999").await,
            Err(SandboxError::NotFound(_))
        ));
    }
}
