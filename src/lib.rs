//! Model Router - a local gateway for the Anthropic Messages API
//!
//! Clients speak the Messages API to one local endpoint and pick a backend by
//! model name. The router resolves the name (or one of its aliases) to a
//! configured provider, rewrites the request for it and relays the response,
//! streaming or not, back unchanged.
//!
//! # Architecture
//!
//! - [`core`]: configuration, credentials, errors, logging, metrics, middleware
//! - [`services`]: model registry, route resolution and upstream forwarding
//! - [`transformer`]: outbound URL, header and body construction, SSE framing
//! - [`api`]: HTTP handlers and router assembly
//!
//! # Configuration
//!
//! Models are read from YAML (`MODEL_ROUTER_CONFIG`, `config/models.yaml` or
//! `models.yaml`), falling back to a built-in set. API keys come from the
//! environment variable each model names.
//!
//! Optional environment overrides:
//! - `GATEWAY_HOST`: bind address (default: 0.0.0.0)
//! - `GATEWAY_PORT`: port (default: 8080)
//! - `REQUEST_TIMEOUT`: upstream deadline in seconds (default: 300)
//! - `LOG_LEVEL`: log level (default: info)
//! - `DEFAULT_MODEL`: model used when a request names none
//! - `ENABLE_LOGGING`: per-request completion logs (default: true)

pub mod api;
pub mod core;
pub mod services;
pub mod transformer;

pub use api::{build_router, AppState};
pub use core::{CredentialStore, ModelConfig, Result, RouterConfig, RouterError};
pub use services::{create_http_client, Forwarder, ModelRegistry, RouteInfo, RouteResolver};
