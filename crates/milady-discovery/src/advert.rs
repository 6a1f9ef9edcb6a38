//! Resolution of raw DNS-SD advertisements into [`DiscoveredGateway`]s.

use std::collections::HashMap;
use std::net::IpAddr;

use milady_proto::DiscoveredGateway;
use milady_proto::discovery::{DEFAULT_DOMAIN, txt};

use crate::names::{decode_service_name, stable_id};

/// A resolved service record, as reported by a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Instance label, possibly still carrying `\DDD` escapes.
    pub instance: String,
    /// Service type, e.g. `_openclaw-gw._tcp`.
    pub service_type: String,
    /// Browse domain, e.g. `local.`.
    pub domain: String,
    /// SRV target host.
    pub host_name: Option<String>,
    /// SRV port.
    pub port: u16,
    /// Resolved addresses.
    pub addresses: Vec<IpAddr>,
    /// TXT record.
    pub txt: HashMap<String, String>,
}

impl Advertisement {
    /// An advertisement with no addresses or TXT entries.
    #[must_use]
    pub fn new(
        instance: impl Into<String>,
        service_type: impl Into<String>,
        domain: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            instance: instance.into(),
            service_type: service_type.into(),
            domain: domain.into(),
            host_name: None,
            port,
            addresses: Vec::new(),
            txt: HashMap::new(),
        }
    }

    /// Set the SRV host name.
    #[must_use]
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    /// Add a resolved address.
    #[must_use]
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.addresses.push(address);
        self
    }

    /// Add a TXT entry.
    #[must_use]
    pub fn with_txt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.txt.insert(key.into(), value.into());
        self
    }

    /// Decoded instance name.
    #[must_use]
    pub fn decoded_name(&self) -> String {
        decode_service_name(&self.instance)
    }

    /// Stable identity of this advertisement.
    #[must_use]
    pub fn stable_id(&self) -> String {
        stable_id(&self.service_type, &self.domain, &self.decoded_name())
    }

    fn txt_value(&self, key: &str) -> Option<&str> {
        self.txt
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Resolve into a gateway entry.
    #[must_use]
    pub fn resolve(&self) -> DiscoveredGateway {
        let decoded = self.decoded_name();
        let name = self
            .txt_value(txt::DISPLAY_NAME)
            .map_or_else(|| decoded.clone(), str::to_string);

        let port = self
            .txt_value(txt::GATEWAY_PORT)
            .and_then(|port| port.parse::<u16>().ok())
            .filter(|port| *port != 0)
            .unwrap_or(self.port);

        DiscoveredGateway {
            stable_id: stable_id(&self.service_type, &self.domain, &decoded),
            name,
            host: self.host(),
            port,
            lan_host: self.txt_value(txt::LAN_HOST).map(str::to_string),
            tailnet_dns: self.txt_value(txt::TAILNET_DNS).map(str::to_string),
            canvas_port: self
                .txt_value(txt::CANVAS_PORT)
                .and_then(|port| port.parse().ok()),
            tls_enabled: self.txt_value(txt::GATEWAY_TLS).is_some_and(parse_bool),
            tls_fingerprint_sha256: self.txt_value(txt::GATEWAY_TLS_SHA256).map(str::to_string),
            is_local: self.domain.eq_ignore_ascii_case(DEFAULT_DOMAIN),
        }
    }

    fn host(&self) -> String {
        let address = self
            .addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| self.addresses.first());
        match address {
            Some(addr) => addr.to_string(),
            None => self
                .host_name
                .as_deref()
                .map(|host| host.trim_end_matches('.').to_string())
                .unwrap_or_default(),
        }
    }
}

/// TXT boolean: `1`, `true` or `yes`, ignoring case.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use test_case::test_case;

    fn office() -> Advertisement {
        Advertisement::new(r"Office\032Gateway", "_openclaw-gw._tcp", "local.", 18789)
            .with_host_name("office-mini.local.")
    }

    #[test_case("1", true ; "one")]
    #[test_case("true", true ; "true lowercase")]
    #[test_case("TRUE", true ; "true uppercase")]
    #[test_case("Yes", true ; "yes mixed case")]
    #[test_case("0", false ; "zero")]
    #[test_case("no", false ; "no")]
    #[test_case("", false ; "empty")]
    fn test_parse_bool(value: &str, expected: bool) {
        assert_eq!(parse_bool(value), expected);
    }

    #[test]
    fn test_resolve_decodes_name_and_stable_id() {
        let gateway = office().resolve();
        assert_eq!(gateway.name, "Office Gateway");
        assert_eq!(gateway.stable_id, "_openclaw-gw._tcp|local.|office gateway");
        assert!(gateway.stable_id.contains("office gateway"));
        assert!(gateway.is_local);
    }

    #[test]
    fn test_resolve_falls_back_to_host_name() {
        let gateway = office().resolve();
        assert_eq!(gateway.host, "office-mini.local");
        assert_eq!(gateway.port, 18789);
        assert!(!gateway.tls_enabled);
    }

    #[test]
    fn test_resolve_prefers_ipv4_address() {
        let gateway = office()
            .with_address(IpAddr::V6(Ipv6Addr::LOCALHOST))
            .with_address(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40)))
            .resolve();
        assert_eq!(gateway.host, "192.168.1.40");
    }

    #[test]
    fn test_resolve_reads_txt_record() {
        let gateway = office()
            .with_txt("displayName", "Studio Mac")
            .with_txt("lanHost", "studio.local")
            .with_txt("tailnetDns", "studio.tail1234.ts.net")
            .with_txt("gatewayPort", "19001")
            .with_txt("canvasPort", "18793")
            .with_txt("gatewayTls", "YES")
            .with_txt("gatewayTlsSha256", "ab:cd")
            .resolve();

        assert_eq!(gateway.name, "Studio Mac");
        assert_eq!(gateway.stable_id, "_openclaw-gw._tcp|local.|office gateway");
        assert_eq!(gateway.port, 19001);
        assert_eq!(gateway.lan_host.as_deref(), Some("studio.local"));
        assert_eq!(gateway.tailnet_dns.as_deref(), Some("studio.tail1234.ts.net"));
        assert_eq!(gateway.canvas_port, Some(18793));
        assert!(gateway.tls_enabled);
        assert_eq!(gateway.tls_fingerprint_sha256.as_deref(), Some("ab:cd"));
    }

    #[test]
    fn test_invalid_gateway_port_uses_srv_port() {
        let gateway = office().with_txt("gatewayPort", "not-a-port").resolve();
        assert_eq!(gateway.port, 18789);
        let gateway = office().with_txt("gatewayPort", "0").resolve();
        assert_eq!(gateway.port, 18789);
    }

    #[test]
    fn test_blank_display_name_ignored() {
        let gateway = office().with_txt("displayName", "   ").resolve();
        assert_eq!(gateway.name, "Office Gateway");
    }

    #[test]
    fn test_wide_area_domain_is_not_local() {
        let gateway =
            Advertisement::new("Remote", "_openclaw-gw._tcp", "example.com.", 443).resolve();
        assert!(!gateway.is_local);
    }
}
