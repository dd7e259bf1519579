//! Turns a client-supplied model name into a concrete provider route.

use crate::core::config::ModelConfig;
use crate::core::error::{Result, RouterError};
use crate::services::model_registry::ModelRegistry;
use std::fmt;
use std::sync::Arc;

/// Route for a single request. Built fresh for every request and never cached.
#[derive(Clone)]
pub struct RouteInfo {
    /// Canonical model name
    pub model_name: String,
    pub model: ModelConfig,
    pub api_key: String,
}

impl fmt::Debug for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteInfo")
            .field("model_name", &self.model_name)
            .field("provider", &self.model.provider)
            .field("model_id", &self.model.model_id)
            .field("api_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RouteResolver {
    registry: Arc<ModelRegistry>,
}

impl RouteResolver {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Resolve `requested` (canonical name or alias) to a route.
    ///
    /// Fails with `invalid_model` listing every registered model when the name
    /// is unknown, and with `authentication_error` naming the environment
    /// variable when the model has no credential.
    pub fn resolve_route(&self, requested: &str) -> Result<RouteInfo> {
        let canonical = self.registry.resolve_model_name(requested);

        let model = self
            .registry
            .config()
            .models
            .get(canonical)
            .ok_or_else(|| RouterError::InvalidModel {
                requested: requested.to_string(),
                available: self.registry.canonical_names(),
            })?;

        let api_key = self
            .registry
            .api_key(canonical)
            .ok_or_else(|| RouterError::Authentication {
                display_name: model.display_name.clone(),
                env_var: model.api_key_env.clone(),
            })?;

        tracing::debug!(
            requested = %requested,
            model = %canonical,
            provider = %model.provider,
            "Route resolved"
        );

        Ok(RouteInfo {
            model_name: canonical.to_string(),
            model: model.clone(),
            api_key: api_key.to_string(),
        })
    }
}
