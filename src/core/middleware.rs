//! HTTP middleware: request IDs and request metrics.

use crate::core::logging::{generate_request_id, REQUEST_ID};
use crate::core::metrics::get_metrics;
use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response extension carrying the resolved model name, set by handlers.
#[derive(Clone, Debug)]
pub struct ModelName(pub String);

/// Response extension carrying the provider name, set by handlers.
#[derive(Clone, Debug)]
pub struct ProviderName(pub String);

/// Assign a request ID, run the request inside its task-local scope and echo
/// it back in the `x-request-id` response header.
///
/// A well-formed inbound `x-request-id` is reused so callers can correlate.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let mut response = REQUEST_ID
        .scope(request_id.clone(), async move { next.run(request).await })
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Record request count and duration for every routed request.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    // Skip metrics endpoint itself to avoid recursion
    if endpoint == "/metrics" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let model = response
        .extensions()
        .get::<ModelName>()
        .map(|m| m.0.as_str())
        .unwrap_or("unknown");
    let provider = response
        .extensions()
        .get::<ProviderName>()
        .map(|p| p.0.as_str())
        .unwrap_or("unknown");
    let status_code = response.status().as_u16().to_string();

    let metrics = get_metrics();
    metrics
        .request_count
        .with_label_values(&[&method, &endpoint, model, provider, &status_code])
        .inc();
    metrics
        .request_duration
        .with_label_values(&[&method, &endpoint])
        .observe(duration);

    response
}
