//! Upstream call execution.
//!
//! The forwarder owns the shared HTTP client. Each call resolves a fresh
//! route, builds the upstream request and either returns the JSON body or a
//! lazily polled stream of SSE event strings.

use crate::api::models::MessagesRequest;
use crate::core::config::GatewayConfig;
use crate::core::error::{Result, RouterError};
use crate::core::error_types::UpstreamOutcome;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::services::route_resolver::{RouteInfo, RouteResolver};
use crate::transformer::{build_upstream_request, SseFramer, UpstreamRequest};
use async_stream::stream;
use axum::http::HeaderMap;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::time::{Duration, Instant};

const MODE_NON_STREAMING: &str = "non_streaming";
const MODE_STREAMING: &str = "streaming";

/// Relayed SSE events, in upstream order.
pub type EventStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Successful non-streaming call.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub model_name: String,
    pub provider: String,
    pub body: Value,
}

/// Streaming call whose route was resolved. Upstream failures after this
/// point surface as a terminal SSE error event inside `events`.
pub struct StreamingRelay {
    pub model_name: String,
    pub provider: String,
    pub events: EventStream,
}

/// Build the shared outbound HTTP client.
///
/// No client-level timeout is set; every call carries its own deadline.
pub fn create_http_client(config: &GatewayConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("model-router/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(config.timeout.clamp(1, 30)))
        .build()?;
    Ok(client)
}

#[derive(Debug, Clone)]
pub struct Forwarder {
    resolver: RouteResolver,
    http_client: reqwest::Client,
    timeout_secs: u64,
    enable_logging: bool,
}

impl Forwarder {
    pub fn new(resolver: RouteResolver, http_client: reqwest::Client, gateway: &GatewayConfig) -> Self {
        Self {
            resolver,
            http_client,
            timeout_secs: gateway.timeout,
            enable_logging: gateway.enable_logging,
        }
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    /// Model name the request will be routed by: its own, or the default.
    pub fn effective_model<'a>(&'a self, request: &'a MessagesRequest) -> &'a str {
        request
            .requested_model()
            .unwrap_or(self.resolver.registry().config().default_model.as_str())
    }

    /// Forward a non-streaming request and return the upstream JSON verbatim.
    pub async fn forward(
        &self,
        request: &MessagesRequest,
        inbound: &HeaderMap,
    ) -> Result<ForwardedResponse> {
        let route = self.resolver.resolve_route(self.effective_model(request))?;
        let upstream = build_upstream_request(&route, request, inbound, false)?;
        let provider = route.model.provider.clone();

        tracing::debug!(
            request_id = %get_request_id(),
            model = %route.model_name,
            provider = %provider,
            url = %upstream.url,
            "Forwarding request"
        );

        let start = Instant::now();
        let result = self.execute(&route, &upstream).await;
        let elapsed = start.elapsed();

        record_upstream(&route, outcome_of(&result), MODE_NON_STREAMING, elapsed);

        match result {
            Ok(body) => {
                if self.enable_logging {
                    let usage = body.get("usage");
                    tracing::info!(
                        request_id = %get_request_id(),
                        model = %route.model_name,
                        provider = %provider,
                        latency_ms = elapsed.as_millis() as u64,
                        input_tokens = %usage_field(usage, "input_tokens"),
                        output_tokens = %usage_field(usage, "output_tokens"),
                        "Request completed"
                    );
                }
                Ok(ForwardedResponse {
                    model_name: route.model_name,
                    provider,
                    body,
                })
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %get_request_id(),
                    model = %route.model_name,
                    provider = %provider,
                    latency_ms = elapsed.as_millis() as u64,
                    error_type = e.error_type(),
                    error = %e,
                    "Upstream request failed"
                );
                Err(e)
            }
        }
    }

    /// Forward a streaming request.
    ///
    /// Route and credential failures are returned before any byte is sent.
    /// The upstream call itself happens when the returned stream is first
    /// polled.
    pub fn forward_stream(
        &self,
        request: &MessagesRequest,
        inbound: &HeaderMap,
    ) -> Result<StreamingRelay> {
        let route = self.resolver.resolve_route(self.effective_model(request))?;
        let upstream = build_upstream_request(&route, request, inbound, true)?;
        let builder = self.request_builder(&upstream);

        let model_name = route.model_name.clone();
        let provider = route.model.provider.clone();
        let timeout_secs = self.timeout_secs;
        let enable_logging = self.enable_logging;
        let request_id = get_request_id();

        tracing::debug!(
            request_id = %request_id,
            model = %model_name,
            provider = %provider,
            url = %upstream.url,
            "Forwarding streaming request"
        );

        let events = stream! {
            let start = Instant::now();
            let stream_events = get_metrics()
                .stream_events
                .with_label_values(&[&route.model_name, &route.model.provider]);

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    let err = transport_error(&route.model.provider, timeout_secs, e);
                    log_stream_failure(&request_id, &route, &err);
                    record_upstream(&route, outcome_of_error(&err), MODE_STREAMING, start.elapsed());
                    yield err.to_sse_event();
                    return;
                }
            };

            if !response.status().is_success() {
                let err = api_error(&route.model.provider, response).await;
                log_stream_failure(&request_id, &route, &err);
                record_upstream(&route, UpstreamOutcome::ApiError, MODE_STREAMING, start.elapsed());
                yield err.to_sse_event();
                return;
            }

            let mut framer = SseFramer::new();
            let mut body = response.bytes_stream();
            let mut relayed: u64 = 0;

            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in framer.push(&chunk) {
                            relayed += 1;
                            stream_events.inc();
                            yield event;
                        }
                    }
                    Err(e) => {
                        let err = transport_error(&route.model.provider, timeout_secs, e);
                        log_stream_failure(&request_id, &route, &err);
                        record_upstream(&route, outcome_of_error(&err), MODE_STREAMING, start.elapsed());
                        yield err.to_sse_event();
                        return;
                    }
                }
            }

            if let Some(event) = framer.finish() {
                relayed += 1;
                stream_events.inc();
                yield event;
            }

            let elapsed = start.elapsed();
            record_upstream(&route, UpstreamOutcome::Success, MODE_STREAMING, elapsed);
            if enable_logging {
                tracing::info!(
                    request_id = %request_id,
                    model = %route.model_name,
                    provider = %route.model.provider,
                    latency_ms = elapsed.as_millis() as u64,
                    events = relayed,
                    "Streaming request completed"
                );
            }
        };

        Ok(StreamingRelay {
            model_name,
            provider,
            events: Box::pin(events),
        })
    }

    fn request_builder(&self, upstream: &UpstreamRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .post(&upstream.url)
            .timeout(Duration::from_secs(self.timeout_secs));
        for (name, value) in &upstream.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.json(&upstream.body)
    }

    async fn execute(&self, route: &RouteInfo, upstream: &UpstreamRequest) -> Result<Value> {
        let provider = &route.model.provider;
        let response = self
            .request_builder(upstream)
            .send()
            .await
            .map_err(|e| transport_error(provider, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(api_error(provider, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(provider, self.timeout_secs, e))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            RouterError::Internal(format!("Invalid JSON response from {}: {}", provider, e))
        })
    }
}

/// Classify a reqwest failure as timeout or connection error.
fn transport_error(provider: &str, timeout_secs: u64, e: reqwest::Error) -> RouterError {
    if e.is_timeout() {
        RouterError::Timeout {
            provider: provider.to_string(),
            timeout_secs,
        }
    } else if e.is_builder() {
        RouterError::Internal(format!("Failed to build request for {}: {}", provider, e))
    } else {
        RouterError::Connection {
            provider: provider.to_string(),
            detail: e.to_string(),
        }
    }
}

/// Build an `api_error` from a non-2xx upstream response.
async fn api_error(provider: &str, response: reqwest::Response) -> RouterError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(text) => extract_error_message(&text),
        Err(e) => e.to_string(),
    };
    RouterError::Api {
        status,
        provider: provider.to_string(),
        message,
    }
}

/// `error.message` from a JSON error body, otherwise the raw text.
pub fn extract_error_message(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|body| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.to_string())
}

fn usage_field(usage: Option<&Value>, field: &str) -> String {
    usage
        .and_then(|u| u.get(field))
        .and_then(Value::as_u64)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn outcome_of_error(e: &RouterError) -> UpstreamOutcome {
    match e {
        RouterError::Timeout { .. } => UpstreamOutcome::Timeout,
        RouterError::Connection { .. } => UpstreamOutcome::ConnectionError,
        _ => UpstreamOutcome::ApiError,
    }
}

fn outcome_of(result: &Result<Value>) -> UpstreamOutcome {
    match result {
        Ok(_) => UpstreamOutcome::Success,
        Err(e) => outcome_of_error(e),
    }
}

fn record_upstream(route: &RouteInfo, outcome: UpstreamOutcome, mode: &str, elapsed: Duration) {
    let metrics = get_metrics();
    metrics
        .upstream_requests
        .with_label_values(&[&route.model_name, &route.model.provider, outcome.as_str()])
        .inc();
    metrics
        .upstream_latency
        .with_label_values(&[&route.model_name, &route.model.provider, mode])
        .observe(elapsed.as_secs_f64());
}

fn log_stream_failure(request_id: &str, route: &RouteInfo, err: &RouterError) {
    tracing::warn!(
        request_id = %request_id,
        model = %route.model_name,
        provider = %route.model.provider,
        error_type = err.error_type(),
        error = %err,
        "Streaming request failed"
    );
}
