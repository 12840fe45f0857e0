//! The unit of work handed to the agent.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one task run. Used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A natural-language task plus where to run it.
///
/// Fields are private so a task cannot change once a run owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    description: String,
    model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    existing_sandbox_id: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            model_id: model_id.into(),
            repository_url: None,
            existing_sandbox_id: None,
        }
    }

    /// Clone this repository into a fresh sandbox before starting.
    pub fn with_repository(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    /// Reuse a sandbox that already exists instead of creating one.
    pub fn with_existing_sandbox(mut self, id: impl Into<String>) -> Self {
        self.existing_sandbox_id = Some(id.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    pub fn existing_sandbox_id(&self) -> Option<&str> {
        self.existing_sandbox_id.as_deref()
    }
}
