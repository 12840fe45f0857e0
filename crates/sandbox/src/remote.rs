//! Remote sandbox service client.
//!
//! Talks to a sandbox service over a small REST protocol:
//!
//! | Method   | Path                          | Body / query                    |
//! |----------|-------------------------------|---------------------------------|
//! | `POST`   | `/sandboxes`                  | `{template}` → `{sandboxId}`    |
//! | `GET`    | `/sandboxes/{id}`             | 404 if unknown                  |
//! | `POST`   | `/sandboxes/{id}/commands`    | `{cmd, cwd, timeoutMs}` → `{stdout, stderr, exitCode}` |
//! | `GET`    | `/sandboxes/{id}/files`       | `?path=` → raw content          |
//! | `PUT`    | `/sandboxes/{id}/files`       | `?path=`, raw content body      |
//! | `DELETE` | `/sandboxes/{id}`             |                                 |
//!
//! Every request carries the `X-API-Key` header.

use async_trait::async_trait;
use codeflow_core::SandboxError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{ExecOutput, SandboxBackend, SandboxProvider};

/// Extra time the HTTP call gets beyond the command's own timeout, so the
/// service can report a timed-out command before the request is dropped.
const HTTP_HEADROOM_SECS: u64 = 10;

/// Connection details shared by the provider and every sandbox it hands out.
struct Api {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SandboxError> {
        request
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SandboxError::Timeout(self.timeout_secs + HTTP_HEADROOM_SECS)
                } else {
                    SandboxError::Network(e.to_string())
                }
            })
    }
}

/// Map a non-success status to a sandbox error, passing success through.
async fn check_status(
    response: reqwest::Response,
    not_found: impl FnOnce() -> SandboxError,
) -> Result<reqwest::Response, SandboxError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }
    if status == 404 {
        return Err(not_found());
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status, body = %body, "Sandbox service returned error");
    Err(SandboxError::ApiError {
        status_code: status,
        message: body,
    })
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    template: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    sandbox_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandRequest<'a> {
    cmd: &'a str,
    cwd: &'a str,
    timeout_ms: u64,
}

/// Creates and reattaches to sandboxes on a remote service.
pub struct RemoteSandboxProvider {
    api: Arc<Api>,
    template: String,
    workspace_root: String,
}

impl RemoteSandboxProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        template: impl Into<String>,
        workspace_root: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs + HTTP_HEADROOM_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api: Arc::new(Api {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key: api_key.into(),
                timeout_secs,
                client,
            }),
            template: template.into(),
            workspace_root: workspace_root.into(),
        }
    }

    fn sandbox(&self, id: String) -> Box<dyn SandboxBackend> {
        Box::new(RemoteSandbox {
            id,
            workspace_root: self.workspace_root.clone(),
            api: Arc::clone(&self.api),
        })
    }
}

#[async_trait]
impl SandboxProvider for RemoteSandboxProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn create(&self) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        debug!(template = %self.template, "Creating remote sandbox");
        let request = self
            .api
            .client
            .post(self.api.url("/sandboxes"))
            .json(&CreateRequest {
                template: &self.template,
            });
        let response = self.api.send(request).await?;
        let response = check_status(response, || {
            SandboxError::NotFound(format!("template {}", self.template))
        })
        .await?;

        let created: CreateResponse =
            response.json().await.map_err(|e| SandboxError::ApiError {
                status_code: 200,
                message: format!("Failed to parse create response: {e}"),
            })?;

        Ok(self.sandbox(created.sandbox_id))
    }

    async fn connect(&self, id: &str) -> Result<Box<dyn SandboxBackend>, SandboxError> {
        debug!(sandbox_id = %id, "Connecting to remote sandbox");
        let request = self.api.client.get(self.api.url(&format!("/sandboxes/{id}")));
        let response = self.api.send(request).await?;
        check_status(response, || SandboxError::NotFound(id.to_string())).await?;
        Ok(self.sandbox(id.to_string()))
    }
}

/// A sandbox living on the remote service.
pub struct RemoteSandbox {
    id: String,
    workspace_root: String,
    api: Arc<Api>,
}

impl RemoteSandbox {
    fn path(&self, suffix: &str) -> String {
        self.api.url(&format!("/sandboxes/{}{suffix}", self.id))
    }
}

#[async_trait]
impl SandboxBackend for RemoteSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn workspace_root(&self) -> &str {
        &self.workspace_root
    }

    async fn exec(&self, cmd: &str, cwd: &str) -> Result<ExecOutput, SandboxError> {
        debug!(sandbox_id = %self.id, cmd = %cmd, cwd = %cwd, "Remote exec");
        let request = self.api.client.post(self.path("/commands")).json(&CommandRequest {
            cmd,
            cwd,
            timeout_ms: self.api.timeout_secs * 1000,
        });
        let response = self.api.send(request).await?;
        let response = check_status(response, || SandboxError::NotFound(self.id.clone())).await?;

        response.json().await.map_err(|e| SandboxError::ApiError {
            status_code: 200,
            message: format!("Failed to parse command response: {e}"),
        })
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        let request = self
            .api
            .client
            .get(self.path("/files"))
            .query(&[("path", path)]);
        let response = self.api.send(request).await?;
        let response = check_status(response, || SandboxError::FileNotFound(path.to_string())).await?;

        response
            .text()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let request = self
            .api
            .client
            .put(self.path("/files"))
            .query(&[("path", path)])
            .body(content.to_string());
        let response = self.api.send(request).await?;
        check_status(response, || SandboxError::NotFound(self.id.clone())).await?;
        Ok(())
    }

    async fn kill(&self) -> Result<(), SandboxError> {
        let request = self.api.client.delete(self.path(""));
        let response = self.api.send(request).await?;
        check_status(response, || SandboxError::NotFound(self.id.clone())).await?;
        Ok(())
    }
}
