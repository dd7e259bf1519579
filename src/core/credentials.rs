//! Provider credentials keyed by canonical model name.
//!
//! Populated once at startup from each model's `api_key_env`; never mutated
//! afterwards, so it can be shared across requests without synchronization.

use crate::core::config::RouterConfig;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Default)]
pub struct CredentialStore {
    keys: HashMap<String, String>,
}

impl CredentialStore {
    /// Read every model's API key from the process environment.
    pub fn from_env(config: &RouterConfig) -> Self {
        Self::from_lookup(config, |var| std::env::var(var).ok())
    }

    /// Build the store using `lookup` to resolve environment variable names.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(config: &RouterConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = HashMap::new();
        for (name, model) in &config.models {
            match lookup(&model.api_key_env).filter(|key| !key.trim().is_empty()) {
                Some(key) => {
                    keys.insert(name.clone(), key);
                }
                None => {
                    tracing::warn!(
                        model = %name,
                        env = %model.api_key_env,
                        "API key not found for model"
                    );
                }
            }
        }
        Self { keys }
    }

    /// Secret for a canonical model name.
    pub fn get(&self, model_name: &str) -> Option<&str> {
        self.keys.get(model_name).map(String::as_str)
    }

    pub fn contains(&self, model_name: &str) -> bool {
        self.keys.contains_key(model_name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for CredentialStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            keys: iter
                .into_iter()
                .map(|(name, key)| (name.into(), key.into()))
                .collect(),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CredentialStore")
            .field("models", &names)
            .finish()
    }
}
