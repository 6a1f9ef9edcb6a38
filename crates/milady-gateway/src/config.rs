//! Connection options and timing configuration.

use std::time::Duration;

use milady_proto::{AuthParams, ClientInfo, ConnectParams};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::reconnect::ReconnectConfig;

/// How long to wait for the hello after sending `connect`.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the response to a request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing used by a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Handshake timeout.
    pub hello_timeout: Duration,
    /// Default per-request timeout.
    pub request_timeout: Duration,
    /// Reconnect backoff.
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hello_timeout: HELLO_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// What to connect to and how to identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Gateway socket URL.
    pub url: String,
    /// Client name sent as the client id.
    pub client_name: String,
    /// Client version.
    pub client_version: String,
    /// Requested role.
    pub role: String,
    /// Requested scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectOptions {
    /// Options for `url` with the given client identity and no credentials.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        client_name: impl Into<String>,
        client_version: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            client_name: client_name.into(),
            client_version: client_version.into(),
            role: "operator".to_string(),
            scopes: Vec::new(),
            token: None,
            password: None,
        }
    }

    /// Set the requested role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Set the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Authenticate with a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Authenticate with a password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Check the options before any socket is opened.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(GatewayError::ConnectFailed(format!(
                "gateway url must start with ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.client_name.trim().is_empty() {
            return Err(GatewayError::ConnectFailed(
                "client name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parameters of the `connect` request for these options.
    #[must_use]
    pub fn connect_params(&self) -> ConnectParams {
        ConnectParams::new(
            ClientInfo::ui(&self.client_name, &self.client_version),
            &self.role,
            self.scopes.clone(),
            AuthParams {
                token: self.token.clone(),
                password: self.password.clone(),
            },
        )
    }
}
