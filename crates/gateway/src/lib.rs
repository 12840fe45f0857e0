//! HTTP gateway for codeflow.
//!
//! Routes:
//! - `POST /api/agent/run`: start a task run and stream its events as SSE
//! - `GET /health`: liveness probe
//!
//! Built on Axum. Every request is traced; CORS is open so a browser
//! dashboard on another origin can consume the stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::{
    Router,
    routing::{get, post},
};
use codeflow_agent::{AgentSettings, Orchestrator};
use codeflow_config::AppConfig;
use codeflow_core::Task;
use codeflow_providers::ModelRouter;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

const BODY_LIMIT: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Orchestrator,
    /// Used when a request names no model.
    pub default_model: String,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/agent/run", post(run_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let orchestrator = Orchestrator::new(
        Arc::new(ModelRouter::from_config(&config)),
        codeflow_sandbox::build_from_config(&config),
        AgentSettings::from_config(&config),
    );
    let state = Arc::new(GatewayState {
        orchestrator,
        default_model: config.default_model.clone(),
    });

    let app = build_router(state);

    info!(addr = %addr, sandbox = ?config.sandbox.backend, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    sandbox_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Blank strings count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `POST /api/agent/run`: one SSE event per run event, named after its
/// type, with the JSON event as data. The stream ends after `done` or
/// `error`.
async fn run_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RunRequest>,
) -> Result<
    Sse<impl Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    let Some(description) = non_empty(payload.task) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing task".into(),
            }),
        ));
    };

    let model = non_empty(payload.model).unwrap_or_else(|| state.default_model.clone());
    info!(model = %model, task_len = description.len(), "Run requested");

    let mut task = Task::new(description, model);
    if let Some(url) = non_empty(payload.repo_url) {
        task = task.with_repository(url);
    }
    if let Some(id) = non_empty(payload.sandbox_id) {
        task = task.with_existing_sandbox(id);
    }

    let stream = state.orchestrator.run(task).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event.event_type()).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
