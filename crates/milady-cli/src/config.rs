//! CLI configuration.
//!
//! Loaded from TOML, then overridden by flags and environment variables:
//!
//! ```toml
//! url = "wss://gateway.example:18789"
//! client_name = "milady-cli"
//! role = "operator"
//! scopes = ["operator.admin"]
//! token = "..."
//! discovery_settle_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use milady_discovery::DiscoveryConfig;
use milady_gateway::ConnectOptions;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::CliError;

/// Gateway URL used when nothing else is configured.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:18789";

/// Client settings for talking to a gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Gateway WebSocket URL.
    pub url: String,
    /// Client id sent in the handshake.
    pub client_name: String,
    /// Requested role.
    pub role: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// How long `discover` waits for the first answers.
    pub discovery_settle_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            client_name: "milady-cli".to_string(),
            role: "operator".to_string(),
            scopes: Vec::new(),
            token: None,
            password: None,
            discovery_settle_ms: 1000,
        }
    }
}

impl CliConfig {
    /// `~/.config/milady/gateway.toml` on this platform.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("milady").join("gateway.toml"))
    }

    /// Load the explicit file, else the default file when it exists, else
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("failed to serialize config: {e}")))
    }

    /// Check the values make sense.
    pub fn validate(&self) -> Result<(), CliError> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(CliError::Config(format!(
                "invalid gateway URL: {}, must start with ws:// or wss://",
                self.url
            )));
        }
        if self.client_name.trim().is_empty() {
            return Err(CliError::Config("client_name cannot be empty".to_string()));
        }
        if self.role.trim().is_empty() {
            return Err(CliError::Config("role cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Apply flag and environment overrides.
    #[must_use]
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.gateway {
            self.url.clone_from(url);
        }
        if let Some(token) = &cli.token {
            self.token = Some(token.clone());
        }
        if let Some(password) = &cli.password {
            self.password = Some(password.clone());
        }
        self
    }

    /// Load, override and validate in one step.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let config = Self::load(cli.config.as_deref())?.with_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Options for `GatewayConnection::connect`.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(&self.url, &self.client_name, env!("CARGO_PKG_VERSION"))
            .with_role(&self.role)
            .with_scopes(self.scopes.iter().cloned());
        if let Some(token) = &self.token {
            options = options.with_token(token);
        }
        if let Some(password) = &self.password {
            options = options.with_password(password);
        }
        options
    }

    /// Settings for the discovery service.
    #[must_use]
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            settle: Duration::from_millis(self.discovery_settle_ms),
            ..DiscoveryConfig::default()
        }
    }
}
