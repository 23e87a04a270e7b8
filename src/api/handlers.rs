//! HTTP handlers for the review API.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::api::body;
use crate::api::response::ApiResponse;
use crate::errors::ApiError;
use crate::review::model::ReviewData;
use crate::review::service::ReviewService;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub service: ReviewService,
}

pub type SharedState = Arc<AppState>;

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/reviews", post(create_review))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

/// POST /api/reviews: interpret the raw body leniently, then review it.
///
/// The body arrives as raw bytes on purpose. A typed JSON extractor would
/// reject the almost-JSON payloads the interpreter exists to recover, so
/// decoding stays out of the framework's hands.
async fn create_review(
    State(state): State<SharedState>,
    raw_body: Bytes,
) -> Result<ApiResponse<ReviewData>, ApiError> {
    let request = body::interpret(&raw_body)?;
    state.service.generate_review(&request).await
}

async fn health_check() -> &'static str {
    "ok"
}

/// Any unmatched path answers with the standard error envelope.
pub async fn fallback_handler() -> ApiError {
    ApiError::from_status(StatusCode::NOT_FOUND)
}

// ── Tests ─────────────────────────────────────────────────────────────
