use std::path::{Path, PathBuf};

use proto::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding the backend base URL.
const ENV_BASE_URL: &str = "CONFAB_BASE_URL";
/// Environment variable overriding the API key.
const ENV_API_KEY: &str = "CONFAB_API_KEY";

/// Application configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend endpoint settings.
    pub api: ApiConfig,
    /// Chat defaults.
    pub chat: ChatConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL.
    pub base_url: String,
    /// API key sent as the `x-api-key` header. `CONFAB_API_KEY` wins.
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: String::new(),
        }
    }
}

/// `[chat]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model selected at startup and used as the fallback when the model
    /// list cannot be fetched.
    pub default_model: String,
    /// Sampling temperature sent with every message.
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-2.5-pro".to_string(),
            temperature: client::DEFAULT_TEMPERATURE,
        }
    }
}

impl Config {
    /// Loads configuration from the given path, or from the default path
    /// when none is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Default on-disk location: `$HOME/.confab/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".confab").join("config.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.chat.temperature.is_finite() || self.chat.temperature < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.temperature".to_string(),
                reason: "must be a finite non-negative number".to_string(),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Effective base URL: environment override first, then config.
    pub fn resolve_base_url(&self) -> String {
        std::env::var(ENV_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api.base_url.clone())
    }

    /// Effective API key: environment override first, then config.
    pub fn resolve_api_key(&self) -> String {
        std::env::var(ENV_API_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api.api_key.clone())
    }
}
