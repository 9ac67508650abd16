//! Configuration loading, validation, and management for the Polyfact SDK.
//!
//! Loads configuration from `~/.polyfact/config.toml` with environment
//! variable overrides. Validates all settings before a client is built.

use polyfact_core::Provider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default generation service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api2.polyfact.com";

/// The root configuration structure.
///
/// Maps directly to `~/.polyfact/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the generation service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Polyfact access token (skips the sign-in flow when set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Project used for token exchange during sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Third-party identity provider settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Defaults for the ReAct agent
    #[serde(default)]
    pub agent: AgentConfig,

    /// Where sign-in state is persisted
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &redact(&self.token))
            .field("project_id", &self.project_id)
            .field("identity", &self.identity)
            .field("agent", &self.agent)
            .field("session", &self.session)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public (anonymous) API key of the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

impl IdentityConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.anon_key.is_some()
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("anon_key", &redact(&self.anon_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_provider")]
    pub provider: Provider,

    #[serde(default = "default_agent_model")]
    pub model: String,

    /// Search rounds before the agent answers with what it has
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_agent_provider() -> Provider {
    Provider::OpenAi
}
fn default_agent_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_loops() -> u32 {
    4
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_agent_provider(),
            model: default_agent_model(),
            max_loops: default_max_loops(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file path (default: `~/.polyfact/session.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from the default path (~/.polyfact/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `POLYFACT_TOKEN`
    /// - `POLYFACT_ENDPOINT`
    /// - `POLYFACT_PROJECT_ID`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("POLYFACT_TOKEN").filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }
        if let Some(endpoint) = lookup("POLYFACT_ENDPOINT").filter(|e| !e.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(project_id) = lookup("POLYFACT_PROJECT_ID").filter(|p| !p.is_empty()) {
            self.project_id = Some(project_id);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".polyfact")
    }

    /// The session file path, falling back to `~/.polyfact/session.json`.
    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("session.json"))
    }

    /// The endpoint without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if let Some(temperature) = self.agent.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(
                    "agent.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.agent.max_loops == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_loops must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if a token is available (from config or environment).
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            project_id: None,
            identity: IdentityConfig::default(),
            agent: AgentConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for polyfact_core::Error {
    fn from(e: ConfigError) -> Self {
        polyfact_core::Error::Config {
            message: e.to_string(),
        }
    }
}
