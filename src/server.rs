//! HTTP API.
//!
//! `GET /ask?question=...` answers with `{"answer": ...}`. Every answer,
//! including refusals and failures, is a `200`; only a missing or blank
//! question is a client error.

use crate::pipeline::Pipeline;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the API router around a shared pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", get(ask))
        .route("/status", get(status))
        .route("/refresh", post(refresh))
        .layer(cors)
        .with_state(pipeline)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskQuery {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(
    State(pipeline): State<Arc<Pipeline>>,
    Query(query): Query<AskQuery>,
) -> impl IntoResponse {
    let question = query.question.unwrap_or_default();
    let question = question.trim();

    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Query parameter 'question' is required".to_string(),
            }),
        )
            .into_response();
    }

    // Dropping this future on client disconnect cancels in-flight generation.
    Json(pipeline.ask(question).await).into_response()
}

async fn status(State(pipeline): State<Arc<Pipeline>>) -> impl IntoResponse {
    Json(pipeline.status())
}

async fn refresh(State(pipeline): State<Arc<Pipeline>>) -> impl IntoResponse {
    match pipeline.refresh().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
