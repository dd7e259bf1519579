//! Configuration management for the model router.
//!
//! Configuration is read once at startup from a YAML file (with `${VAR}`
//! expansion), layered with environment overrides, and then shared as an
//! immutable value. Every field has a default, so a missing or partial file
//! still yields a usable configuration.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Provider identifier that speaks the Messages API natively.
pub const NATIVE_PROVIDER: &str = "anthropic";

/// Endpoint appended to a provider's base URL unless overridden per model.
pub const DEFAULT_ENDPOINT_PATH: &str = "/v1/messages";

/// Locations probed, in order, when no explicit config path is given.
pub const DEFAULT_CONFIG_LOCATIONS: &[&str] = &["config/models.yaml", "models.yaml"];

/// Connection parameters for one upstream model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Human-readable name shown in listings
    pub display_name: String,

    /// Provider identifier (e.g. `anthropic`, `deepseek`)
    pub provider: String,

    /// Model identifier sent upstream
    pub model_id: String,

    /// Base URL of the provider's Messages-compatible surface
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// `anthropic-version` header value (native provider only)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Header carrying the API key
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    #[serde(default = "default_true")]
    pub supports_streaming: bool,

    #[serde(default = "default_true")]
    pub supports_tools: bool,

    /// Ceiling applied to client-requested `max_tokens`
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    #[serde(default = "default_context_window")]
    pub context_window: u64,

    /// Static headers added to every upstream request
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    /// Path appended to `base_url` for the messages endpoint
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
}

impl ModelConfig {
    /// Create a model config with default limits and headers.
    pub fn new(
        provider: impl Into<String>,
        model_id: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        let model_id = model_id.into();
        Self {
            display_name: model_id.clone(),
            provider: provider.into(),
            model_id,
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            api_version: default_api_version(),
            auth_header: default_auth_header(),
            supports_streaming: true,
            supports_tools: true,
            max_tokens: default_max_tokens(),
            context_window: default_context_window(),
            extra_headers: BTreeMap::new(),
            endpoint_path: default_endpoint_path(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_window(mut self, context_window: u64) -> Self {
        self.context_window = context_window;
        self
    }

    /// Whether this model is served by the native Messages API provider.
    pub fn is_native(&self) -> bool {
        self.provider == NATIVE_PROVIDER
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,

    /// Upstream request deadline in seconds
    pub timeout: u64,

    /// Log per-request completion lines
    pub enable_logging: bool,

    pub log_level: String,

    /// Add `X-Model-Router` to non-streaming responses
    pub include_model_header: bool,

    pub health_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout: 300,
            enable_logging: true,
            log_level: "info".to_string(),
            include_model_header: true,
            health_path: "/health".to_string(),
        }
    }
}

/// Root configuration: models, aliases and gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Model used when a request omits `model`
    pub default_model: String,

    /// Canonical model name -> connection parameters
    pub models: BTreeMap<String, ModelConfig>,

    /// Alternate name -> canonical model name
    pub aliases: BTreeMap<String, String>,

    pub gateway: GatewayConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: "sonnet".to_string(),
            models: builtin_models(),
            aliases: builtin_aliases(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from `path`, or from the first default location that
    /// exists, falling back to built-in defaults. Environment overrides are
    /// applied last.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use model_router::core::config::RouterConfig;
    ///
    /// let config = RouterConfig::load(None).expect("Failed to load config");
    /// println!("default model: {}", config.default_model);
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve which config file to read.
    ///
    /// An explicit path must exist. Without one, the default locations are
    /// probed and `None` means "use built-in defaults".
    pub fn locate(path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = path {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            bail!("Configuration file not found: {}", path.display());
        }

        Ok(DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists()))
    }

    /// Read and parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse YAML content after expanding environment variable references.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: RouterConfig = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Apply environment variable overrides (env vars take precedence).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GATEWAY_HOST") {
            self.gateway.host = host;
        }

        if let Ok(port_str) = std::env::var("GATEWAY_PORT") {
            match port_str.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port_str, "Ignoring invalid GATEWAY_PORT"),
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.gateway.log_level = level;
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT") {
            match timeout_str.parse::<u64>() {
                Ok(timeout) => self.gateway.timeout = timeout,
                Err(_) => tracing::warn!(value = %timeout_str, "Ignoring invalid REQUEST_TIMEOUT"),
            }
        }

        if let Ok(enabled) = std::env::var("ENABLE_LOGGING") {
            self.gateway.enable_logging = str_to_bool(&enabled);
        }

        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            if !model.trim().is_empty() {
                self.default_model = model;
            }
        }
    }

    /// Report inconsistencies between models, aliases and the default model.
    ///
    /// None of these are fatal: dangling aliases resolve to "not found" at
    /// request time.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (alias, target) in &self.aliases {
            if self.models.contains_key(alias) {
                issues.push(format!(
                    "Model '{}' is shadowed by an alias of the same name and is unreachable",
                    alias
                ));
            }
            if !self.models.contains_key(target) {
                if self.aliases.contains_key(target) {
                    issues.push(format!(
                        "Alias '{}' points at alias '{}'; aliases must target a model directly",
                        alias, target
                    ));
                } else {
                    issues.push(format!(
                        "Alias '{}' points at unknown model '{}'",
                        alias, target
                    ));
                }
            }
        }

        let default_target = self
            .aliases
            .get(&self.default_model)
            .unwrap_or(&self.default_model);
        let default_known = self.models.contains_key(default_target);
        if !default_known {
            issues.push(format!(
                "Default model '{}' does not match any configured model",
                self.default_model
            ));
        }

        if self.gateway.timeout == 0 {
            issues.push("Gateway timeout is 0; every upstream call will time out".to_string());
        }

        issues
    }
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_auth_header() -> String {
    "x-api-key".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u64 {
    8192
}

fn default_context_window() -> u64 {
    128_000
}

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn builtin_models() -> BTreeMap<String, ModelConfig> {
    let anthropic = "https://api.anthropic.com";
    [
        (
            "sonnet",
            ModelConfig::new("anthropic", "claude-sonnet-4-20250514", anthropic, "ANTHROPIC_API_KEY")
                .with_display_name("Claude Sonnet 4")
                .with_max_tokens(64_000)
                .with_context_window(200_000),
        ),
        (
            "opus",
            ModelConfig::new("anthropic", "claude-opus-4-20250514", anthropic, "ANTHROPIC_API_KEY")
                .with_display_name("Claude Opus 4")
                .with_max_tokens(32_000)
                .with_context_window(200_000),
        ),
        (
            "haiku",
            ModelConfig::new("anthropic", "claude-3-5-haiku-20241022", anthropic, "ANTHROPIC_API_KEY")
                .with_display_name("Claude Haiku 3.5")
                .with_context_window(200_000),
        ),
        (
            "deepseek",
            ModelConfig::new(
                "deepseek",
                "deepseek-chat",
                "https://api.deepseek.com/anthropic",
                "DEEPSEEK_API_KEY",
            )
            .with_display_name("DeepSeek V3"),
        ),
        (
            "kimi",
            ModelConfig::new(
                "moonshot",
                "kimi-k2-0905-preview",
                "https://api.moonshot.ai/anthropic",
                "MOONSHOT_API_KEY",
            )
            .with_display_name("Kimi K2")
            .with_context_window(256_000),
        ),
        (
            "glm",
            ModelConfig::new(
                "zhipu",
                "glm-4.6",
                "https://open.bigmodel.cn/api/anthropic",
                "ZHIPU_API_KEY",
            )
            .with_display_name("GLM 4.6")
            .with_context_window(200_000),
        ),
        (
            "qwen",
            ModelConfig::new(
                "dashscope",
                "qwen3-coder-plus",
                "https://dashscope.aliyuncs.com/apps/anthropic",
                "DASHSCOPE_API_KEY",
            )
            .with_display_name("Qwen3 Coder Plus")
            .with_context_window(1_000_000),
        ),
        (
            "minimax",
            ModelConfig::new(
                "minimax",
                "MiniMax-M2",
                "https://api.minimax.io/anthropic",
                "MINIMAX_API_KEY",
            )
            .with_display_name("MiniMax M2")
            .with_context_window(204_800),
        ),
    ]
    .into_iter()
    .map(|(name, model)| (name.to_string(), model))
    .collect()
}

fn builtin_aliases() -> BTreeMap<String, String> {
    [
        ("claude-sonnet-4-20250514", "sonnet"),
        ("claude-opus-4-20250514", "opus"),
        ("claude-3-5-haiku-20241022", "haiku"),
        ("ds", "deepseek"),
        ("deepseek-chat", "deepseek"),
        ("k2", "kimi"),
        ("glm-4.6", "glm"),
        ("qwen-coder", "qwen"),
        ("m2", "minimax"),
    ]
    .into_iter()
    .map(|(alias, target)| (alias.to_string(), target.to_string()))
    .collect()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-?([^}]*))?\}")
            .expect("env var pattern is a valid regex")
    })
}

/// Expand environment variables in configuration content.
///
/// Supports patterns: ${VAR}, ${VAR:-default}, ${VAR:default}
fn expand_env_vars(content: &str) -> String {
    env_var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
