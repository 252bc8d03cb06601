//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `iobridge.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use iobridge_adapter_memory::DEFAULT_NAMESPACE;
use iobridge_app::services::BridgeOptions;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object graph connection.
    pub gateway: GatewayConfig,
    /// Bridge behaviour.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Optional state watcher logging every change.
    pub watch: WatchConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// JSON snapshot seeding the object graph.
    pub snapshot: Option<PathBuf>,
    /// Own instance namespace (`<adapter>.<n>`).
    pub namespace: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Classification language; unset adopts the system language.
    pub language: Option<String>,
    /// Seconds a classification result is reused.
    pub cache_ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// State id pattern to log changes of.
    pub pattern: Option<String>,
}

impl Config {
    /// Load configuration from `iobridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("iobridge.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("IOBRIDGE_SNAPSHOT") {
            self.gateway.snapshot = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("IOBRIDGE_NAMESPACE") {
            self.gateway.namespace = val;
        }
        if let Ok(val) = std::env::var("IOBRIDGE_LANGUAGE") {
            self.bridge.language = Some(val);
        }
        if let Ok(val) = std::env::var("IOBRIDGE_CACHE_TTL_SECS")
            && let Ok(secs) = val.parse()
        {
            self.bridge.cache_ttl_secs = secs;
        }
        if let Ok(val) = std::env::var("IOBRIDGE_WATCH") {
            self.watch.pattern = Some(val);
        }
        if let Ok(val) = std::env::var("IOBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let namespace = &self.gateway.namespace;
        let valid_namespace = namespace
            .split_once('.')
            .is_some_and(|(adapter, number)| {
                !adapter.is_empty()
                    && !number.is_empty()
                    && number.chars().all(|c| c.is_ascii_digit())
            });
        if !valid_namespace {
            return Err(ConfigError::Validation(format!(
                "namespace must look like <adapter>.<n>, got {namespace:?}"
            )));
        }
        if self.bridge.language.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "language must not be empty".to_string(),
            ));
        }
        if self.watch.pattern.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(
                "watch pattern must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Options handed to the bridge service.
    #[must_use]
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            language: self.bridge.language.clone(),
            cache_ttl: Duration::from_secs(self.bridge.cache_ttl_secs),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            language: None,
            cache_ttl_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "iobridged=info,iobridge_app=info,iobridge_adapter_memory=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
