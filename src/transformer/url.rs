//! Upstream URL construction.

use crate::core::config::ModelConfig;

/// Join the model's base URL and endpoint path.
///
/// Trailing slashes on the base are dropped and the path always gets exactly
/// one leading slash.
pub fn build_url(model: &ModelConfig) -> String {
    let base = model.base_url.trim_end_matches('/');
    let path = model.endpoint_path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
