//! Sandbox access for codeflow.
//!
//! A [`SandboxProvider`] creates or reattaches to sandboxes; each one is a
//! [`SandboxBackend`] that the [`SandboxClient`] wraps with path
//! normalization and the higher-level operations the tools use.
//!
//! Backends:
//! - [`RemoteSandboxProvider`]: a sandbox service over HTTP
//! - [`LocalSandboxProvider`]: host directories, development only
//! - [`MemorySandboxProvider`]: in-process, for dry runs and tests

pub mod backend;
pub mod client;
pub mod local;
pub mod memory;
pub mod patch;
pub mod path;
pub mod remote;
pub mod shell;

pub use backend::{ExecOutput, SandboxBackend, SandboxProvider};
pub use client::SandboxClient;
pub use local::LocalSandboxProvider;
pub use memory::{MemorySandbox, MemorySandboxProvider};
pub use patch::{PatchApplier, PatchOutcome};
pub use remote::RemoteSandboxProvider;

use codeflow_config::{AppConfig, SandboxBackendKind};
use std::sync::Arc;

/// Build the sandbox provider selected in configuration.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn SandboxProvider> {
    let sandbox = &config.sandbox;
    match sandbox.backend {
        SandboxBackendKind::Remote => {
            if sandbox.api_key.is_none() {
                tracing::warn!("No sandbox API key configured; requests will be unauthenticated");
            }
            Arc::new(RemoteSandboxProvider::new(
                &sandbox.api_url,
                sandbox.api_key.clone().unwrap_or_default(),
                &sandbox.template,
                &sandbox.workspace_root,
                sandbox.request_timeout_secs,
            ))
        }
        SandboxBackendKind::Local => Arc::new(LocalSandboxProvider::new(
            config.local_sandbox_dir(),
            sandbox.request_timeout_secs,
        )),
        SandboxBackendKind::Memory => {
            Arc::new(MemorySandboxProvider::new(&sandbox.workspace_root))
        }
    }
}
