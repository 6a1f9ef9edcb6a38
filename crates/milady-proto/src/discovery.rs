//! Data model for gateways advertised over DNS-SD.

use serde::{Deserialize, Serialize};

/// DNS-SD service type advertised by gateways.
pub const SERVICE_TYPE: &str = "_openclaw-gw._tcp";

/// Browse domain.
pub const DEFAULT_DOMAIN: &str = "local.";

/// TXT record keys published by gateways.
pub mod txt {
    /// Human-friendly gateway name.
    pub const DISPLAY_NAME: &str = "displayName";
    /// Host name on the LAN.
    pub const LAN_HOST: &str = "lanHost";
    /// Tailnet DNS name.
    pub const TAILNET_DNS: &str = "tailnetDns";
    /// Gateway socket port, overriding the SRV port.
    pub const GATEWAY_PORT: &str = "gatewayPort";
    /// Canvas host port.
    pub const CANVAS_PORT: &str = "canvasPort";
    /// Whether the gateway terminates TLS.
    pub const GATEWAY_TLS: &str = "gatewayTls";
    /// SHA-256 fingerprint of the gateway certificate.
    pub const GATEWAY_TLS_SHA256: &str = "gatewayTlsSha256";
}

/// A gateway resolved from a DNS-SD advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredGateway {
    /// Identity derived from service type, domain and normalized name.
    pub stable_id: String,
    /// Display name.
    pub name: String,
    /// Host to connect to.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Host name on the LAN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_host: Option<String>,
    /// Tailnet DNS name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailnet_dns: Option<String>,
    /// Canvas host port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_port: Option<u16>,
    /// Whether the gateway expects TLS.
    pub tls_enabled: bool,
    /// Certificate fingerprint to pin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_fingerprint_sha256: Option<String>,
    /// Whether the advertisement came from the link-local domain.
    pub is_local: bool,
}

impl DiscoveredGateway {
    /// The socket URL for this gateway.
    #[must_use]
    pub fn websocket_url(&self) -> String {
        let scheme = if self.tls_enabled { "wss" } else { "ws" };
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{scheme}://[{}]:{}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }
}

/// What happened to a gateway entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryEventKind {
    /// First sighting of this stable id.
    Found,
    /// A known stable id was re-resolved.
    Updated,
    /// The advertisement went away.
    Lost,
}

/// A change to the set of discovered gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    /// Kind of change.
    pub kind: DiscoveryEventKind,
    /// The gateway concerned.
    pub gateway: DiscoveredGateway,
}
