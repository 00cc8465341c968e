//! HTTP service.
//!
//! Exposes the recommendation pipeline as a JSON API. Each request runs the
//! pipeline on its own tokio task; the shared [`Advisor`] holds only
//! read-only catalog state and stateless clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/recommend` | Run the pipeline for a set of quiz answers |
//! | `GET`  | `/health` | Health check (returns version and catalog size) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "empty_candidates", "message": "...", "raw": null } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request`, `unknown_feature` | 400 |
//! | `empty_candidates` | 422 |
//! | `extraction_error`, `finalize_parse_error`, `parse_error`, `schema_error`, `upstream_error`, `transport_error` | 502 |
//! | `cancelled` | 503 |
//! | `deadline_exceeded` | 504 |
//! | `config_error` | 500 |
//!
//! `raw` carries the model output for extraction and finalize failures.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::error::AdvisorError;
use crate::models::ShopperAnswers;
use crate::pipeline::{Advisor, CancelToken, Recommendation};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    advisor: Arc<Advisor>,
}

/// Build the router. Split from [`run_server`] so tests can bind their own
/// listener.
pub fn router(advisor: Arc<Advisor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { advisor })
}

/// Bind to `bind_addr` and serve until the process is terminated.
pub async fn run_server(bind_addr: &str, advisor: Arc<Advisor>) -> anyhow::Result<()> {
    let app = router(advisor);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "advisor listening");
    axum::serve(listener, app).await?;

    Ok(())
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
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    raw: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                raw: self.raw,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        let status = match &err {
            AdvisorError::UnknownFeature(_) => StatusCode::BAD_REQUEST,
            AdvisorError::EmptyCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AdvisorError::Extraction { .. }
            | AdvisorError::FinalizeParse { .. }
            | AdvisorError::Parse { .. }
            | AdvisorError::Schema(_)
            | AdvisorError::Upstream { .. }
            | AdvisorError::Transport { .. } => StatusCode::BAD_GATEWAY,
            AdvisorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AdvisorError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            AdvisorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
            raw: err.raw_output().map(str::to_string),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
        raw: None,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    trims: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        trims: state.advisor.catalog().len(),
    })
}

// ============ POST /recommend ============

/// Runs the pipeline for the posted answers.
///
/// A request with every answer blank is rejected with `400` before any
/// upstream call is made.
async fn handle_recommend(
    State(state): State<AppState>,
    payload: Result<Json<ShopperAnswers>, JsonRejection>,
) -> Result<Json<Recommendation>, AppError> {
    let Json(answers) = payload.map_err(|e| bad_request(e.body_text()))?;

    let all_blank = [
        &answers.purpose,
        &answers.location,
        &answers.appearance,
        &answers.features,
        &answers.budget,
    ]
    .iter()
    .all(|a| a.trim().is_empty());
    if all_blank {
        return Err(bad_request("at least one answer must be provided"));
    }

    let cancel = CancelToken::new();
    match state.advisor.recommend(&answers, &cancel).await {
        Ok(rec) => Ok(Json(rec)),
        Err(e) => {
            warn!(code = e.code(), error = %e, "recommendation failed");
            Err(e.into())
        }
    }
}
