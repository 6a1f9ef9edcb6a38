//! The `connect` handshake: parameters sent by the client and the hello
//! payload returned by the gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Protocol version spoken by this client, sent as both bounds.
pub const PROTOCOL_VERSION: u32 = 3;

/// Method name of the handshake request.
pub const CONNECT_METHOD: &str = "connect";

/// Parameters of the `connect` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// Lowest acceptable protocol version.
    pub min_protocol: u32,
    /// Highest acceptable protocol version.
    pub max_protocol: u32,
    /// Identity of the connecting client.
    pub client: ClientInfo,
    /// Requested role.
    pub role: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Client capabilities. Always empty for this client.
    pub caps: Vec<String>,
    /// Opaque credentials.
    pub auth: AuthParams,
}

impl ConnectParams {
    /// Build handshake parameters pinned to [`PROTOCOL_VERSION`].
    #[must_use]
    pub fn new(client: ClientInfo, role: impl Into<String>, scopes: Vec<String>, auth: AuthParams) -> Self {
        Self {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client,
            role: role.into(),
            scopes,
            caps: Vec::new(),
            auth,
        }
    }

    /// Convert to the JSON value placed in the request's `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> Result<Value, ProtoError> {
        serde_json::to_value(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }
}

/// Client identity block of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub id: String,
    /// Client version.
    pub version: String,
    /// Host platform.
    pub platform: String,
    /// Client mode, always `ui`.
    pub mode: String,
}

impl ClientInfo {
    /// Identity of a UI client running on the current platform.
    #[must_use]
    pub fn ui(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            platform: std::env::consts::OS.to_string(),
            mode: "ui".to_string(),
        }
    }
}

/// Credentials; absent fields are omitted from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Hello payload returned in the successful `connect` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HelloOk {
    /// Negotiated protocol version.
    #[serde(default)]
    pub protocol: Option<u32>,
    /// Granted role and scopes.
    #[serde(default)]
    pub auth: Option<HelloAuth>,
    /// Methods and events the gateway offers.
    #[serde(default)]
    pub features: Option<HelloFeatures>,
}

/// Granted authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HelloAuth {
    /// Granted role.
    #[serde(default)]
    pub role: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

/// Gateway feature advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HelloFeatures {
    /// Callable methods.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Events the gateway may push.
    #[serde(default)]
    pub events: Vec<String>,
}

impl HelloOk {
    /// Parse the payload of a successful handshake response.
    ///
    /// # Errors
    ///
    /// Fails when the payload is absent, is not an object, or has fields of
    /// the wrong type.
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, ProtoError> {
        let payload = payload.ok_or(ProtoError::MissingField("payload"))?;
        if !payload.is_object() {
            return Err(ProtoError::Validation(
                "hello payload must be an object".to_string(),
            ));
        }
        Self::deserialize(payload).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Negotiated protocol, defaulting to [`PROTOCOL_VERSION`].
    #[must_use]
    pub fn protocol(&self) -> u32 {
        self.protocol.unwrap_or(PROTOCOL_VERSION)
    }

    /// Granted role, if the gateway reported one.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.auth.as_ref().and_then(|auth| auth.role.as_deref())
    }

    /// Granted scopes, empty when not reported.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.auth
            .as_ref()
            .and_then(|auth| auth.scopes.clone())
            .unwrap_or_default()
    }

    /// Advertised methods.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.features
            .as_ref()
            .map(|f| f.methods.clone())
            .unwrap_or_default()
    }

    /// Advertised events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.features
            .as_ref()
            .map(|f| f.events.clone())
            .unwrap_or_default()
    }
}
