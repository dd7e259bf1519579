//! Routing and forwarding services.
//!
//! - [`model_registry`]: configured models, aliases and credential availability
//! - [`route_resolver`]: per-request model name to route resolution
//! - [`forwarder`]: upstream execution, both single-shot and streaming

pub mod forwarder;
pub mod model_registry;
pub mod route_resolver;

pub use forwarder::{create_http_client, EventStream, ForwardedResponse, Forwarder, StreamingRelay};
pub use model_registry::{ModelListing, ModelRegistry};
pub use route_resolver::{RouteInfo, RouteResolver};
