//! Prometheus metrics for monitoring the model router.

use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Inbound requests by method, endpoint, model, provider and status
    pub request_count: IntCounterVec,

    /// Inbound request duration in seconds
    pub request_duration: HistogramVec,

    /// Upstream calls by model, provider and outcome
    pub upstream_requests: IntCounterVec,

    /// Upstream latency in seconds (full body for non-streaming, stream
    /// lifetime for streaming)
    pub upstream_latency: HistogramVec,

    /// SSE events relayed to clients
    pub stream_events: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call more than once; every call returns the same instance.
///
/// # Examples
///
/// ```no_run
/// use model_router::core::metrics::init_metrics;
///
/// let metrics = init_metrics();
/// metrics.request_count.with_label_values(&["GET", "/health", "unknown", "unknown", "200"]).inc();
/// ```
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "model_router_requests_total",
            "Total number of requests",
            &["method", "endpoint", "model", "provider", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "model_router_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
        )
        .expect("Failed to register request_duration metric");

        let upstream_requests = register_int_counter_vec!(
            "model_router_upstream_requests_total",
            "Total number of upstream provider calls",
            &["model", "provider", "outcome"]
        )
        .expect("Failed to register upstream_requests metric");

        let upstream_latency = register_histogram_vec!(
            "model_router_upstream_latency_seconds",
            "Upstream provider latency in seconds",
            &["model", "provider", "mode"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]
        )
        .expect("Failed to register upstream_latency metric");

        let stream_events = register_int_counter_vec!(
            "model_router_stream_events_total",
            "Total number of SSE events relayed",
            &["model", "provider"]
        )
        .expect("Failed to register stream_events metric");

        Metrics {
            request_count,
            request_duration,
            upstream_requests,
            upstream_latency,
            stream_events,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
