//! Core functionality for the model router.
//!
//! This module contains fundamental components used throughout the application:
//! - Configuration and credential loading
//! - Error handling
//! - Logging, metrics and HTTP middleware

pub mod config;
pub mod credentials;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod metrics;
pub mod middleware;

// Re-export commonly used types
pub use config::{GatewayConfig, ModelConfig, RouterConfig};
pub use credentials::CredentialStore;
pub use error::{ErrorResponse, Result, RouterError};
pub use logging::{generate_request_id, get_request_id, init_tracing, REQUEST_ID};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{request_id_middleware, track_metrics, ModelName, ProviderName};
