//! Configuration loading for the gateway client.
//!
//! ```toml
//! api_base_url = "https://api.example.com/prod"
//! request_timeout_ms = 10000      # optional, transport default when absent
//!
//! [retry]                         # optional
//! max_retries = 3
//! base_delay_ms = 1000
//!
//! [auth]                          # optional, at most one source
//! token_file = "/run/user/1000/calorie-session"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{EnvToken, FileToken, NoToken, StaticToken, TokenProvider};
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};

pub const CONFIG_ENV: &str = "CALORIE_CLIENT_CONFIG";
pub const DEFAULT_COLLECTION_PATH: &str = "/foods";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default = "default_collection_path")]
    pub collection_path: String,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSettings {
    pub bearer_token: Option<String>,
    pub token_env: Option<String>,
    pub token_file: Option<PathBuf>,
}

fn default_collection_path() -> String {
    DEFAULT_COLLECTION_PATH.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or CALORIE_CLIENT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Config with defaults for everything except the base URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            collection_path: default_collection_path(),
            request_timeout_ms: None,
            retry: RetrySettings::default(),
            auth: AuthSettings::default(),
        }
    }

    /// Load from `path`, or from the file named by `CALORIE_CLIENT_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.collection_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "collection_path",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.base_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms",
                reason: "must be > 0".to_string(),
            });
        }
        let sources = [
            self.auth.bearer_token.is_some(),
            self.auth.token_env.is_some(),
            self.auth.token_file.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "set at most one of bearer_token, token_env, token_file".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        if let Some(token) = &self.auth.bearer_token {
            Arc::new(StaticToken::new(token.clone()))
        } else if let Some(var) = &self.auth.token_env {
            Arc::new(EnvToken::new(var.clone()))
        } else if let Some(path) = &self.auth.token_file {
            Arc::new(FileToken::new(path.clone()))
        } else {
            Arc::new(NoToken)
        }
    }
}
