//! HTTP request handlers.

use crate::api::models::{HealthResponse, MessagesRequest, ModelInfo, ModelList};
use crate::api::streaming::{create_sse_response, insert_model_headers};
use crate::core::config::RouterConfig;
use crate::core::credentials::CredentialStore;
use crate::core::error::{Result, RouterError};
use crate::core::logging::get_request_id;
use crate::core::middleware::{ModelName, ProviderName};
use crate::services::{Forwarder, ModelRegistry, RouteResolver};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Shared, immutable application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<RouterConfig>,
    pub registry: Arc<ModelRegistry>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(
        config: Arc<RouterConfig>,
        credentials: CredentialStore,
        http_client: reqwest::Client,
    ) -> Self {
        let registry = Arc::new(ModelRegistry::new(config.clone(), credentials));
        let forwarder = Forwarder::new(
            RouteResolver::new(registry.clone()),
            http_client,
            &config.gateway,
        );
        Self {
            config,
            registry,
            forwarder,
        }
    }
}

/// Handle `POST /v1/messages`.
///
/// A missing or blank `model` is replaced with the configured default before
/// routing.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let body = body.map_err(|e| {
        RouterError::InvalidRequest(format!("Failed to read request body: {}", e.body_text()))
    })?;
    let mut request = parse_messages_request(&body)?;

    let model = state.forwarder.effective_model(&request).to_string();
    request.model = Some(model.clone());

    tracing::debug!(
        request_id = %get_request_id(),
        model = %model,
        stream = request.is_stream(),
        messages = request.messages.len(),
        "Received messages request"
    );

    if request.is_stream() {
        let relay = state.forwarder.forward_stream(&request, &headers)?;
        return Ok(create_sse_response(relay, &model));
    }

    let forwarded = state.forwarder.forward(&request, &headers).await?;
    let mut response = Json(forwarded.body).into_response();
    if state.config.gateway.include_model_header {
        insert_model_headers(response.headers_mut(), &model, &forwarded.provider);
    }
    response
        .extensions_mut()
        .insert(ModelName(forwarded.model_name));
    response
        .extensions_mut()
        .insert(ProviderName(forwarded.provider));
    Ok(response)
}

fn parse_messages_request(body: &[u8]) -> Result<MessagesRequest> {
    serde_json::from_slice(body).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            RouterError::InvalidRequest(format!("Invalid JSON: {}", e))
        } else {
            RouterError::InvalidRequest(format!("Invalid request: {}", e))
        }
    })
}

/// Handle `POST /v1/messages/count_tokens`.
pub async fn count_tokens() -> RouterError {
    RouterError::NotImplemented(
        "Token counting is not yet implemented in the model router".to_string(),
    )
}

/// Handle `GET /v1/models`.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    let data = state
        .registry
        .list_models()
        .into_iter()
        .map(|m| ModelInfo {
            id: m.name,
            object: "model".to_string(),
            display_name: m.display_name,
            provider: m.provider,
            model_id: m.model_id,
            available: m.available,
        })
        .collect();

    Json(ModelList {
        object: "list".to_string(),
        data,
    })
}

/// Handle the health endpoint. Always 200, even with no credentials.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let models = state
        .registry
        .model_status()
        .into_iter()
        .map(|(name, status)| (name, status.to_string()))
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_model: state.config.default_model.clone(),
        models,
    })
}

/// Prometheus text exposition.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| RouterError::Internal(e.to_string()))?;

    let mut response = (StatusCode::OK, buffer).into_response();
    let content_type = HeaderValue::from_str(encoder.format_type())
        .map_err(|e| RouterError::Internal(e.to_string()))?;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> RouterError {
    RouterError::NotFound(format!("Route {} {} not found", method, uri.path()))
}

/// Fallback for known routes called with the wrong method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> RouterError {
    RouterError::MethodNotAllowed(format!(
        "Method {} not allowed for {}",
        method,
        uri.path()
    ))
}
