//! Model Router - Main entry point
//!
//! Loads the model configuration, reads provider keys from the environment and
//! serves the Messages API gateway until interrupted.

use anyhow::{Context, Result};
use model_router::{
    build_router, create_http_client,
    core::{init_metrics, init_tracing},
    AppState, CredentialStore, RouterConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    let config_path = std::env::var("MODEL_ROUTER_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let config = RouterConfig::load(config_path.as_deref())?;

    init_tracing(&config.gateway.log_level);
    init_metrics();

    for issue in config.validate() {
        tracing::warn!("Configuration: {}", issue);
    }

    let credentials = CredentialStore::from_env(&config);
    let http_client = create_http_client(&config.gateway)?;

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone(), credentials, http_client));
    state.registry.log_models();

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;

    tracing::info!("Starting Model Router on {}", addr);
    tracing::info!("Default model: {}", config.default_model);
    tracing::info!("Messages API: /v1/messages, /v1/models");
    tracing::info!(
        "Health endpoint: {}",
        model_router::api::health_route(&config.gateway.health_path)
    );
    tracing::info!("Metrics endpoint: /metrics");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
