//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stores: Vec<StoreConfig>,

    #[serde(default)]
    pub locale: LocaleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One Learning Record Store endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub page_limit: Option<u32>,

    /// Only fetch statements stored after this instant (ISO-8601)
    #[serde(default)]
    pub since: Option<String>,
}

fn default_version() -> String {
    "1.0.3".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: None,
            secret: None,
            version: default_version(),
            timeout_secs: default_timeout(),
            page_limit: None,
            since: None,
        }
    }
}

/// Locale settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleConfig {
    /// Default locale for language-map resolution (e.g. "en-US")
    #[serde(default)]
    pub default: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("xapi-lens").join("config.toml")),
            Some(PathBuf::from("/etc/xapi-lens/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Store overrides apply to the first store; an endpoint creates one
    /// when none is configured
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = var("XAPI_LENS_ENDPOINT") {
            match self.stores.first_mut() {
                Some(store) => store.endpoint = endpoint,
                None => self.stores.push(StoreConfig {
                    endpoint,
                    ..StoreConfig::default()
                }),
            }
        }
        if let Some(store) = self.stores.first_mut() {
            if let Some(key) = var("XAPI_LENS_KEY") {
                store.key = Some(key);
            }
            if let Some(secret) = var("XAPI_LENS_SECRET") {
                store.secret = Some(secret);
            }
        }

        if let Some(locale) = var("XAPI_LENS_LOCALE") {
            self.locale.default = Some(locale);
        }

        if let Some(level) = var("XAPI_LENS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("XAPI_LENS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# xapi-lens Configuration
#
# Environment variables override these settings:
# - XAPI_LENS_ENDPOINT, XAPI_LENS_KEY, XAPI_LENS_SECRET (first store)
# - XAPI_LENS_LOCALE
# - XAPI_LENS_LOG_LEVEL
# - XAPI_LENS_LOG_FORMAT

# One [[stores]] table per Learning Record Store. Statements from several
# stores are merged; a statement id seen twice is kept once.
[[stores]]
# xAPI endpoint (statements are read from <endpoint>/statements)
endpoint = "http://localhost:8080/xapi"

# Basic auth credentials
key = ""
secret = ""

# X-Experience-API-Version header
version = "1.0.3"

# Request timeout in seconds
timeout_secs = 30

# Statements per page (store default when unset)
# page_limit = 500

# Only fetch statements stored after this instant
# since = "2025-01-01T00:00:00Z"

[locale]
# Default locale for display texts (falls back to LC_ALL / LANG)
# default = "en-US"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
