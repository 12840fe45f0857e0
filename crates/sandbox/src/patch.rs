//! Fast-apply: turn whatever the model sent for a file into an update.
//!
//! The payload is either a unified diff or the complete new file content.
//! A diff is applied as-is; full content is first turned into a diff
//! against what is on disk so the change goes through the same patch path.
//! If patching fails for any reason the file is simply overwritten with
//! the payload, so a fast-apply never fails on a bad diff.

use codeflow_core::SandboxError;
use similar::TextDiff;
use tracing::{debug, warn};

use crate::client::SandboxClient;
use crate::path;

/// How a fast-apply ended up changing the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// A diff payload applied cleanly.
    Applied,
    /// Full content was diffed against the old file and applied.
    FastApplied,
    /// Patching failed; the payload was written verbatim.
    Overwritten,
    /// The backend cannot patch; the payload was written verbatim.
    WrittenWithoutPatch,
}

impl PatchOutcome {
    /// The message reported back to the model.
    pub fn message(self) -> &'static str {
        match self {
            Self::Applied => "Patch applied",
            Self::FastApplied => "Fast-apply updated file",
            Self::Overwritten => "Patched failed; wrote file content directly",
            Self::WrittenWithoutPatch => "Wrote file content directly (applyPatch unavailable)",
        }
    }
}

/// A payload is a diff if it opens with a `---` header followed by `+++`.
pub fn looks_like_unified_diff(payload: &str) -> bool {
    payload.starts_with("--- ") && payload.contains("\n+++ ")
}

/// Unified diff from `old` to `new` for `rel_path`.
///
/// A file that does not exist yet gets a `/dev/null` source header.
pub fn synthesize_diff(rel_path: &str, old: &str, new: &str, exists: bool) -> String {
    let from = if exists {
        format!("a/{rel_path}")
    } else {
        "/dev/null".to_string()
    };
    let to = format!("b/{rel_path}");

    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&from, &to)
        .to_string()
}

pub struct PatchApplier<'a> {
    sandbox: &'a SandboxClient,
}

impl<'a> PatchApplier<'a> {
    pub fn new(sandbox: &'a SandboxClient) -> Self {
        Self { sandbox }
    }

    /// Bring `path` to the state described by `payload`.
    pub async fn apply(&self, path: &str, payload: &str) -> Result<PatchOutcome, SandboxError> {
        let target = self.sandbox.resolve(path);

        if !self.sandbox.supports_patch() {
            self.sandbox.write_file(&target, payload).await?;
            return Ok(PatchOutcome::WrittenWithoutPatch);
        }

        if looks_like_unified_diff(payload) {
            debug!(path = %target, "Applying unified diff");
            if self.try_patch(payload).await {
                return Ok(PatchOutcome::Applied);
            }
        } else {
            let (old, exists) = match self.sandbox.read_file(&target).await {
                Ok(content) => (content, true),
                Err(_) => (String::new(), false),
            };

            if old == payload {
                if !exists {
                    self.sandbox.write_file(&target, payload).await?;
                }
                return Ok(PatchOutcome::FastApplied);
            }

            let rel = path::relative_to_root(&target, self.sandbox.workspace_root())
                .unwrap_or(&target);
            let diff = synthesize_diff(rel, &old, payload, exists);
            debug!(path = %target, "Applying synthesized diff");
            if self.try_patch(&diff).await {
                return Ok(PatchOutcome::FastApplied);
            }
        }

        self.sandbox.write_file(&target, payload).await?;
        Ok(PatchOutcome::Overwritten)
    }

    async fn try_patch(&self, diff: &str) -> bool {
        match self.sandbox.apply_patch(diff, None).await {
            Ok(out) if out.success() => true,
            Ok(out) => {
                warn!(exit_code = out.exit_code, stderr = %out.failure_output(), "Patch did not apply");
                false
            }
            Err(e) => {
                warn!(error = %e, "Patch did not apply");
                false
            }
        }
    }
}
