//! JSON HTTP API over the stimulus pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/sources` | Registered adapters and context store state |
//! | `POST` | `/context` | Run context selection for `{ "topic" }` |
//! | `POST` | `/stimulus` | Generate a stimulus for `{ "topic", "question"? }` |
//! | `POST` | `/answer` | Answer `{ "question" }` from retrieved context, with citations |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "topic must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `generation_failed` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{AnswerReport, StimulusPipeline, StimulusReport};
use crate::selector::Selection;

type AppState = Arc<StimulusPipeline>;

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, bind: &str) -> anyhow::Result<()> {
    let pipeline = Arc::new(StimulusPipeline::from_config(config));
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "stimulus server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// The route table, with CORS applied. Exposed so tests can serve it on
/// an ephemeral port.
pub fn build_router(pipeline: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sources", get(handle_sources))
        .route("/context", post(handle_context))
        .route("/stimulus", post(handle_stimulus))
        .route("/answer", post(handle_answer))
        .layer(cors)
        .with_state(pipeline)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::EmptyTopic => bad_request(e.to_string()),
            PipelineError::Generation(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "generation_failed".to_string(),
                message: e.to_string(),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourceInfo {
    name: String,
    source: String,
    description: String,
    default_limit: usize,
}

#[derive(Serialize)]
struct SourcesResponse {
    store: String,
    adapters: Vec<SourceInfo>,
}

async fn handle_sources(State(pipeline): State<AppState>) -> Json<SourcesResponse> {
    let selector = pipeline.selector();
    let adapters = selector
        .router()
        .adapters()
        .iter()
        .map(|a| SourceInfo {
            name: a.name().to_string(),
            source: a.source().to_string(),
            description: a.description().to_string(),
            default_limit: a.default_limit(),
        })
        .collect();

    Json(SourcesResponse {
        store: selector.store().state().as_str().to_string(),
        adapters,
    })
}

// ============ POST /context ============

#[derive(Deserialize)]
struct ContextRequest {
    topic: String,
}

async fn handle_context(
    State(pipeline): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<Selection>, AppError> {
    let selection = pipeline.selector().select(&req.topic).await?;
    Ok(Json(selection))
}

// ============ POST /stimulus ============

#[derive(Deserialize)]
struct StimulusRequest {
    topic: String,
    #[serde(default)]
    question: bool,
}

async fn handle_stimulus(
    State(pipeline): State<AppState>,
    Json(req): Json<StimulusRequest>,
) -> Result<Json<StimulusReport>, AppError> {
    let report = pipeline.run(&req.topic, req.question).await?;
    Ok(Json(report))
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
}

async fn handle_answer(
    State(pipeline): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerReport>, AppError> {
    let report = pipeline.answer(&req.question).await?;
    Ok(Json(report))
}
