//! Logging setup and per-request context.
//!
//! Request IDs live in task-local storage so log lines deep inside the
//! forwarder can include them without threading the ID through every call.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Formats timestamps in the local timezone (respects `TZ`).
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Build the filter directive string for the given base level.
///
/// Noisy HTTP library targets are always pinned to `warn`, even when
/// `RUST_LOG` asks for `trace`.
pub fn filter_directives(base: &str) -> String {
    format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base.to_lowercase()
    )
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `log_level`. `NO_COLOR` disables ANSI output and
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(log_level: &str) {
    let base_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    let filter = EnvFilter::try_new(filter_directives(&base_filter))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives("info")));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let no_color = std::env::var("NO_COLOR").is_ok();

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_timer(LocalTime))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(LocalTime)
                    .with_ansi(!no_color),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
