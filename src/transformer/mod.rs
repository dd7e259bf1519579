//! Outbound request construction.
//!
//! Takes a resolved route and the client request and produces everything the
//! forwarder needs for one upstream call:
//!
//! ```text
//! RouteInfo + MessagesRequest + inbound headers
//!     ↓
//! [url]      base_url + endpoint_path
//! [headers]  content type, auth, native-only version/beta, extras
//! [body]     model id substitution, max_tokens ceiling, stream flag
//!     ↓
//! UpstreamRequest
//! ```
//!
//! Responses are not transformed. Every configured provider speaks the
//! Messages protocol, so bodies and SSE events are relayed verbatim.

pub mod body;
pub mod headers;
pub mod stream;
pub mod url;

pub use body::{build_request_body, clamp_max_tokens};
pub use headers::{build_headers, UpstreamHeaders};
pub use stream::{format_sse_event, SseFramer};
pub use url::build_url;

use crate::api::models::MessagesRequest;
use crate::core::error::Result;
use crate::services::route_resolver::RouteInfo;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// A fully built upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: UpstreamHeaders,
    pub body: Map<String, Value>,
}

/// Build the upstream request for `route`.
///
/// `stream` is authoritative: the body's `stream` flag is overwritten to match
/// it so the upstream mode always agrees with how the response is consumed.
pub fn build_upstream_request(
    route: &RouteInfo,
    request: &MessagesRequest,
    inbound: &HeaderMap,
    stream: bool,
) -> Result<UpstreamRequest> {
    let mut body = build_request_body(request, &route.model)?;
    body::set_stream_flag(&mut body, stream);

    Ok(UpstreamRequest {
        url: build_url(&route.model),
        headers: build_headers(route, inbound, stream),
        body,
    })
}
