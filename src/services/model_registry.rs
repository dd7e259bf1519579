//! Model registry: name and alias lookup over the loaded configuration.
//!
//! The registry owns the immutable [`RouterConfig`] and [`CredentialStore`]
//! built at startup. Lookups never fail hard; unknown names simply come back
//! as `None` so callers can produce a precise error.

use crate::core::config::{ModelConfig, RouterConfig};
use crate::core::credentials::CredentialStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const STATUS_AVAILABLE: &str = "available";
pub const STATUS_NO_API_KEY: &str = "no_api_key";

/// One row of the model listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelListing {
    pub name: String,
    pub display_name: String,
    pub provider: String,
    pub model_id: String,
    pub available: bool,
    pub supports_streaming: bool,
    pub supports_tools: bool,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    config: Arc<RouterConfig>,
    credentials: CredentialStore,
}

impl ModelRegistry {
    pub fn new(config: Arc<RouterConfig>, credentials: CredentialStore) -> Self {
        Self {
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Map a name to its canonical model name.
    ///
    /// Aliases are checked first and resolve to their target (even a dangling
    /// one), so an alias named like a model shadows that model. Anything else
    /// passes through unchanged.
    pub fn resolve_model_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.config.aliases.get(name) {
            Some(target) => target.as_str(),
            None => name,
        }
    }

    /// Model config for a canonical name or alias.
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.config.models.get(self.resolve_model_name(name))
    }

    /// Every registered canonical model name, in listing order.
    pub fn canonical_names(&self) -> Vec<String> {
        self.config.models.keys().cloned().collect()
    }

    /// Credential for a canonical model name.
    pub fn api_key(&self, canonical_name: &str) -> Option<&str> {
        self.credentials.get(canonical_name)
    }

    pub fn is_available(&self, canonical_name: &str) -> bool {
        self.credentials.contains(canonical_name)
    }

    pub fn list_models(&self) -> Vec<ModelListing> {
        self.config
            .models
            .iter()
            .map(|(name, model)| ModelListing {
                name: name.clone(),
                display_name: model.display_name.clone(),
                provider: model.provider.clone(),
                model_id: model.model_id.clone(),
                available: self.is_available(name),
                supports_streaming: model.supports_streaming,
                supports_tools: model.supports_tools,
            })
            .collect()
    }

    /// Availability status per canonical model, as reported by `/health`.
    pub fn model_status(&self) -> BTreeMap<String, &'static str> {
        self.config
            .models
            .keys()
            .map(|name| {
                let status = if self.is_available(name) {
                    STATUS_AVAILABLE
                } else {
                    STATUS_NO_API_KEY
                };
                (name.clone(), status)
            })
            .collect()
    }

    /// Log the loaded models and their credential status.
    pub fn log_models(&self) {
        tracing::info!(
            models = self.config.models.len(),
            aliases = self.config.aliases.len(),
            default_model = %self.config.default_model,
            "Model registry loaded"
        );
        for listing in self.list_models() {
            tracing::info!(
                model = %listing.name,
                display_name = %listing.display_name,
                provider = %listing.provider,
                status = if listing.available { "ready" } else { "no api key" },
                "Registered model"
            );
        }
    }
}
