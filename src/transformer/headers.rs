//! Outbound header construction.
//!
//! Inbound headers are never copied wholesale. The only one forwarded is
//! `anthropic-beta`, and only to the native provider.

use crate::services::route_resolver::RouteInfo;
use axum::http::HeaderMap;
use std::collections::BTreeMap;

pub const ANTHROPIC_VERSION_HEADER: &str = "anthropic-version";
pub const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// Upstream headers keyed by lowercase name.
pub type UpstreamHeaders = BTreeMap<String, String>;

/// Build the header set for an upstream call.
pub fn build_headers(route: &RouteInfo, inbound: &HeaderMap, stream: bool) -> UpstreamHeaders {
    let model = &route.model;
    let mut headers = UpstreamHeaders::new();

    headers.insert("content-type".to_string(), CONTENT_TYPE_JSON.to_string());
    headers.insert(
        "accept".to_string(),
        if stream {
            CONTENT_TYPE_EVENT_STREAM
        } else {
            CONTENT_TYPE_JSON
        }
        .to_string(),
    );
    headers.insert(model.auth_header.to_ascii_lowercase(), route.api_key.clone());

    if model.is_native() {
        headers.insert(
            ANTHROPIC_VERSION_HEADER.to_string(),
            model.api_version.clone(),
        );
        if let Some(beta) = inbound
            .get(ANTHROPIC_BETA_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            headers.insert(ANTHROPIC_BETA_HEADER.to_string(), beta.to_string());
        }
    }

    for (name, value) in &model.extra_headers {
        headers.insert(name.to_ascii_lowercase(), value.clone());
    }

    headers
}
