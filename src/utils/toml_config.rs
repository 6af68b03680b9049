//! TOML-based configuration for the relay
//!
//! This module provides declarative configuration for the HTTP server, the
//! registry location, the routing oracle and the dispatch budget via a TOML
//! file (`relay.toml`).
//!
//! Configuration is read once at startup. The oracle credential is never
//! stored in the file: the file names the environment variable that holds it,
//! and a missing variable is a fatal startup error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from relay.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Registry Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the agent registry file
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,

    /// Reload the registry when the file changes
    #[serde(default)]
    pub watch: bool,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("config/agent_registry.toml")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            watch: false,
        }
    }
}

// ============= Oracle Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model name; provider default when omitted
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable containing the API key; provider default when omitted
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// API base URL; provider default when omitted
    #[serde(default)]
    pub base_url: Option<String>,

    /// Budget for one routing decision
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_oracle_timeout() -> u64 {
    30
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_oracle_timeout(),
            temperature: None,
        }
    }
}

impl OracleConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(match self.provider {
            ProviderKind::Gemini => "gemini-pro",
            ProviderKind::OpenAI => "gpt-4o-mini",
        })
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(match self.provider {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(match self.provider {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Dispatch Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Budget for one downstream agent call
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,
}

fn default_dispatch_timeout() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout(),
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl RelayConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it.
    ///
    /// Used by commands that only need the registry location.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "oracle.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.registry.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "registry.path must not be empty".to_string(),
            ));
        }
        if let Some(ref base_url) = self.oracle.base_url {
            reqwest::Url::parse(base_url).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "oracle.base_url '{}' is not a valid URL: {}",
                    base_url, e
                ))
            })?;
        }

        self.oracle_api_key()?;

        Ok(())
    }

    /// Get the oracle credential from the environment
    pub fn oracle_api_key(&self) -> Result<String, ConfigError> {
        let name = self.oracle.api_key_env();
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
