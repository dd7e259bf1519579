//! API layer for the model router.
//!
//! This module contains the HTTP handlers, request/response models and SSE
//! response construction, plus [`build_router`] which wires them together.

pub mod disconnect;
pub mod handlers;
pub mod models;
pub mod streaming;

pub use handlers::{
    count_tokens, health, list_models, messages, method_not_allowed, metrics_handler, not_found,
    AppState,
};
pub use models::{HealthResponse, MessagesRequest, ModelInfo, ModelList};
pub use streaming::create_sse_response;

use crate::core::middleware::{request_id_middleware, track_metrics};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const DEFAULT_HEALTH_PATH: &str = "/health";
const RESERVED_PATHS: &[&str] = &[
    "/v1/messages",
    "/v1/messages/count_tokens",
    "/v1/models",
    "/metrics",
];

/// Build the application router.
///
/// Request bodies are not size-capped; long conversations and inline images
/// routinely exceed axum's default limit.
pub fn build_router(state: Arc<AppState>) -> Router {
    let health_path = health_route(&state.config.gateway.health_path);

    Router::new()
        .route("/v1/messages", post(messages))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/v1/models", get(list_models))
        .route(&health_path, get(health))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(track_metrics))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Normalize the configured health path into a mountable route.
///
/// Blank values and paths that collide with another endpoint fall back to
/// `/health`.
pub fn health_route(configured: &str) -> String {
    let trimmed = configured.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_HEALTH_PATH.to_string();
    }

    let path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    if RESERVED_PATHS.contains(&path.as_str()) || path.contains(['{', '}', '*', ':']) {
        tracing::warn!(
            health_path = %configured,
            "Health path conflicts with another route, using {}",
            DEFAULT_HEALTH_PATH
        );
        return DEFAULT_HEALTH_PATH.to_string();
    }
    path
}
