//! Server-Sent Events response construction.

use crate::api::disconnect::DisconnectStream;
use crate::core::logging::get_request_id;
use crate::core::middleware::{ModelName, ProviderName};
use crate::services::forwarder::StreamingRelay;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;

pub const MODEL_ROUTER_HEADER: &str = "x-model-router";
pub const MODEL_PROVIDER_HEADER: &str = "x-model-provider";

/// Wrap a relay in a `text/event-stream` response.
///
/// Status is always 200; upstream failures arrive as a terminal error event.
pub fn create_sse_response(relay: StreamingRelay, requested_model: &str) -> Response {
    let body = Body::from_stream(DisconnectStream::new(
        relay.events,
        get_request_id(),
        relay.model_name.clone(),
    ));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    insert_model_headers(headers, requested_model, &relay.provider);

    response
        .extensions_mut()
        .insert(ModelName(relay.model_name));
    response
        .extensions_mut()
        .insert(ProviderName(relay.provider));
    response
}

/// Set `X-Model-Router` and `X-Model-Provider`. Values that are not valid
/// header text are skipped.
pub fn insert_model_headers(headers: &mut HeaderMap, model: &str, provider: &str) {
    for (name, value) in [(MODEL_ROUTER_HEADER, model), (MODEL_PROVIDER_HEADER, provider)] {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
