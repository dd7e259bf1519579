//! Outbound request body rewriting.

use crate::api::models::MessagesRequest;
use crate::core::config::ModelConfig;
use crate::core::error::Result;
use serde_json::{Map, Value};

/// Build the upstream body from the client request.
///
/// The client-facing model name is replaced with the provider's model id and
/// `max_tokens` is capped at the model's ceiling. A request without
/// `max_tokens` is left without one.
pub fn build_request_body(request: &MessagesRequest, model: &ModelConfig) -> Result<Map<String, Value>> {
    let mut body = match serde_json::to_value(request)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    body.insert("model".to_string(), Value::String(model.model_id.clone()));
    clamp_max_tokens(&mut body, model.max_tokens);

    Ok(body)
}

/// Lower `max_tokens` to `ceiling` if the body asks for more. Never raises it.
pub fn clamp_max_tokens(body: &mut Map<String, Value>, ceiling: u64) {
    if let Some(requested) = body.get("max_tokens").and_then(Value::as_u64) {
        if requested > ceiling {
            body.insert("max_tokens".to_string(), Value::from(ceiling));
            tracing::debug!(requested, ceiling, "Capped max_tokens to model limit");
        }
    }
}

/// Force the `stream` flag to match the forwarding mode.
pub fn set_stream_flag(body: &mut Map<String, Value>, stream: bool) {
    body.insert("stream".to_string(), Value::Bool(stream));
}
