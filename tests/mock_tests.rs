//! Mock-based tests for upstream provider interactions.
//!
//! These tests use wiremock to simulate Messages-compatible providers
//! without making actual HTTP requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use model_router::{
    build_router,
    core::{init_metrics, CredentialStore, ModelConfig, RouterConfig},
    AppState,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, Request as MockRequest, ResponseTemplate,
};

/// Config whose `deepseek` and `sonnet` models point at the mock server.
fn mock_config(base_url: &str, timeout_secs: u64) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.models.insert(
        "deepseek".to_string(),
        ModelConfig::new(
            "deepseek",
            "deepseek-chat",
            format!("{}/anthropic", base_url),
            "DEEPSEEK_API_KEY",
        )
        .with_display_name("DeepSeek V3"),
    );
    config.models.insert(
        "sonnet".to_string(),
        ModelConfig::new(
            "anthropic",
            "claude-sonnet-4-20250514",
            base_url,
            "ANTHROPIC_API_KEY",
        )
        .with_max_tokens(64_000),
    );
    config.gateway.timeout = timeout_secs;
    config
}

fn credentials() -> CredentialStore {
    [("deepseek", "sk-deepseek"), ("sonnet", "sk-anthropic")]
        .into_iter()
        .collect()
}

/// Create a test app backed by the mock server
fn create_test_app(config: RouterConfig) -> Router {
    init_metrics();

    let http_client = reqwest::Client::builder()
        .build()
        .expect("Failed to build HTTP client");

    let state = Arc::new(AppState::new(Arc::new(config), credentials(), http_client));
    build_router(state)
}

async fn create_test_app_with_mock(mock_server: &MockServer) -> Router {
    create_test_app(mock_config(&mock_server.uri(), 300))
}

fn post_messages(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/v1/messages")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn message_response(model: &str) -> Value {
    json!({
        "id": "msg_123",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{"type": "text", "text": "Hello! How can I help you?"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 9}
    })
}

fn sse_body(events: &[(&str, Value)]) -> String {
    events
        .iter()
        .map(|(name, data)| format!("event: {}\ndata: {}\n\n", name, data))
        .collect()
}

#[tokio::test]
async fn test_alias_routes_to_deepseek() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .and(header("x-api-key", "sk-deepseek"))
        .and(body_partial_json(json!({"model": "deepseek-chat", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("deepseek-chat")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "max_tokens": 100
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-model-router"], "ds");
    assert_eq!(response.headers()["x-model-provider"], "deepseek");

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    // Upstream body is relayed without rewriting
    assert_eq!(json, message_response("deepseek-chat"));
}

#[tokio::test]
async fn test_model_header_can_be_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("deepseek-chat")))
        .mount(&mock_server)
        .await;

    let mut config = mock_config(&mock_server.uri(), 300);
    config.gateway.include_model_header = false;
    let app = create_test_app(config);

    let response = app
        .oneshot(post_messages(json!({
            "model": "deepseek",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-model-router"));
}

#[tokio::test]
async fn test_max_tokens_clamped_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .and(body_partial_json(json!({"max_tokens": 8192})))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("deepseek-chat")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "deepseek",
            "messages": [{"role": "user", "content": "Hello"}],
            "max_tokens": 999999
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_default_model_substitution() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"model": "claude-sonnet-4-20250514"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("claude-sonnet-4-20250514")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-model-router"], "sonnet");
}

#[tokio::test]
async fn test_native_provider_header_forwarding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-anthropic"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("anthropic-beta", "tools-2024-04-04"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("claude-sonnet-4-20250514")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let request = Request::builder()
        .uri("/v1/messages")
        .method("POST")
        .header("content-type", "application/json")
        .header("anthropic-beta", "tools-2024-04-04")
        .header("authorization", "Bearer client-token")
        .body(Body::from(
            json!({
                "model": "sonnet",
                "messages": [{"role": "user", "content": "Hello"}]
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_compatible_provider_gets_no_anthropic_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("deepseek-chat")))
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let request = Request::builder()
        .uri("/v1/messages")
        .method("POST")
        .header("content-type", "application/json")
        .header("anthropic-beta", "tools-2024-04-04")
        .header("anthropic-version", "2023-01-01")
        .body(Body::from(
            json!({
                "model": "ds",
                "messages": [{"role": "user", "content": "Hello"}]
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received: Vec<MockRequest> = mock_server.received_requests().await.unwrap();
    let headers = &received[0].headers;
    assert!(headers.get("anthropic-beta").is_none());
    assert!(headers.get("anthropic-version").is_none());
}

#[tokio::test]
async fn test_provider_error_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "Too many requests"}
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "api_error");
    assert_eq!(
        json["error"]["message"],
        "Upstream API error (deepseek): Too many requests"
    );
}

#[tokio::test]
async fn test_provider_error_raw_text_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json["error"]["message"],
        "Upstream API error (deepseek): Service Unavailable"
    );
}

#[tokio::test]
async fn test_provider_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(message_response("deepseek-chat"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(mock_config(&mock_server.uri(), 1));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["error"]["type"], "timeout_error");
    assert_eq!(
        json["error"]["message"],
        "Request to deepseek timed out after 1s"
    );
}

#[tokio::test]
async fn test_connection_refused() {
    let app = create_test_app(mock_config("http://127.0.0.1:1", 5));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["error"]["type"], "connection_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to connect to deepseek: "));
}

#[tokio::test]
async fn test_streaming_relays_events_in_order() {
    let mock_server = MockServer::start().await;

    let upstream = sse_body(&[
        ("message_start", json!({"type": "message_start"})),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hi"}}),
        ),
        ("message_stop", json!({"type": "message_stop"})),
    ]);

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({"model": "deepseek-chat", "stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream.clone()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.headers()["x-model-router"], "ds");

    assert_eq!(body_text(response).await, upstream);
}

#[tokio::test]
async fn test_streaming_trailing_partial_event() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("event: ping\ndata: {}\n\nevent: message_stop\ndata: {}"),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(
        body_text(response).await,
        "event: ping\ndata: {}\n\nevent: message_stop\ndata: {}\n\n"
    );
}

#[tokio::test]
async fn test_streaming_upstream_error_is_single_event() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"type": "api_error", "message": "Overloaded"}
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_mock(&mock_server).await;

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    // Status is committed before the upstream answers
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert_eq!(text.matches("\n\n").count(), 1);
    assert!(text.starts_with("event: error\ndata: "));

    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    let json: Value = serde_json::from_str(data).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "api_error");
    assert_eq!(
        json["error"]["message"],
        "Upstream API error (deepseek): Overloaded"
    );
}

#[tokio::test]
async fn test_streaming_timeout_event() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/anthropic/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("data: late\n\n")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(mock_config(&mock_server.uri(), 1));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.starts_with("event: error\n"));
    assert!(text.contains("timeout_error"));
    assert!(!text.contains("late"));
}

#[tokio::test]
async fn test_streaming_connection_error_event() {
    let app = create_test_app(mock_config("http://127.0.0.1:1", 5));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.starts_with("event: error\n"));
    assert!(text.contains("connection_error"));
}

/// What the raw upstream does after its first streamed event.
#[derive(Clone, Copy)]
enum AfterFirstEvent {
    Stall,
    Close,
}

/// Upstream that answers one request with a chunked SSE body holding a
/// single event, then stalls or drops the connection.
async fn spawn_raw_sse_upstream(after: AfterFirstEvent) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_full_request(&mut socket).await;

        let event = "event: a\ndata: 1\n\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
            event.len(),
            event
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        match after {
            AfterFirstEvent::Stall => tokio::time::sleep(Duration::from_secs(30)).await,
            AfterFirstEvent::Close => drop(socket),
        }
    });

    format!("http://{}", addr)
}

/// Consume request headers and a content-length body.
async fn read_full_request(socket: &mut tokio::net::TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed before sending a request");
        received.extend_from_slice(&buf[..n]);

        let Some(header_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..header_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= header_end + 4 + content_length {
            return;
        }
    }
}

fn split_events(text: &str) -> Vec<String> {
    text.split_inclusive("\n\n").map(str::to_string).collect()
}

fn error_event_json(event: &str) -> Value {
    assert!(event.starts_with("event: error\ndata: "), "not an error event: {:?}", event);
    let data = event
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    serde_json::from_str(data).unwrap()
}

#[tokio::test]
async fn test_streaming_stall_after_first_event_times_out() {
    let base_url = spawn_raw_sse_upstream(AfterFirstEvent::Stall).await;
    let app = create_test_app(mock_config(&base_url, 1));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = split_events(&body_text(response).await);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], "event: a\ndata: 1\n\n");

    let json = error_event_json(&events[1]);
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "timeout_error");
    assert_eq!(
        json["error"]["message"],
        "Request to deepseek timed out after 1s"
    );
}

#[tokio::test]
async fn test_streaming_close_after_first_event_is_connection_error() {
    let base_url = spawn_raw_sse_upstream(AfterFirstEvent::Close).await;
    let app = create_test_app(mock_config(&base_url, 5));

    let response = app
        .oneshot(post_messages(json!({
            "model": "ds",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = split_events(&body_text(response).await);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], "event: a\ndata: 1\n\n");

    let json = error_event_json(&events[1]);
    assert_eq!(json["error"]["type"], "connection_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to connect to deepseek: "));
}
