//! Session state negotiated by a successful handshake.

use chrono::{DateTime, Utc};
use milady_proto::HelloOk;
use serde::Serialize;
use uuid::Uuid;

/// Facts about the current connection, replaced on every successful hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Locally generated session id. The gateway does not know it.
    pub session_id: String,
    /// Negotiated protocol version.
    pub protocol_version: u32,
    /// Granted role.
    pub role: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Methods the gateway offers.
    pub methods: Vec<String>,
    /// Events the gateway may push.
    pub events: Vec<String>,
    /// When the hello arrived.
    pub connected_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Build a session from a hello, falling back to the requested role.
    #[must_use]
    pub fn from_hello(hello: &HelloOk, requested_role: &str) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            protocol_version: hello.protocol(),
            role: hello.role().unwrap_or(requested_role).to_string(),
            scopes: hello.scopes(),
            methods: hello.methods(),
            events: hello.events(),
            connected_at: Utc::now(),
        }
    }
}

/// Result of a successful `connect()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResult {
    /// Always `true`.
    pub connected: bool,
    /// Session id.
    pub session_id: String,
    /// Negotiated protocol version.
    pub protocol: u32,
    /// Methods the gateway offers.
    pub methods: Vec<String>,
    /// Events the gateway may push.
    pub events: Vec<String>,
    /// Granted role.
    pub role: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl From<&SessionInfo> for ConnectResult {
    fn from(session: &SessionInfo) -> Self {
        Self {
            connected: true,
            session_id: session.session_id.clone(),
            protocol: session.protocol_version,
            methods: session.methods.clone(),
            events: session.events.clone(),
            role: session.role.clone(),
            scopes: session.scopes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_from_full_hello() {
        let hello = HelloOk::from_payload(Some(&json!({
            "protocol": 3,
            "auth": {"role": "admin", "scopes": ["operator.admin"]},
            "features": {"methods": ["chat.send"], "events": ["tick"]}
        })))
        .expect("hello");

        let session = SessionInfo::from_hello(&hello, "operator");
        assert_eq!(session.protocol_version, 3);
        assert_eq!(session.role, "admin");
        assert_eq!(session.scopes, vec!["operator.admin".to_string()]);
        assert!(Uuid::parse_str(&session.session_id).is_ok());
    }

    #[test]
    fn test_session_falls_back_to_requested_role() {
        let hello = HelloOk::default();
        let session = SessionInfo::from_hello(&hello, "operator");
        assert_eq!(session.role, "operator");
        assert_eq!(session.protocol_version, 3);
        assert!(session.methods.is_empty());
    }

    #[test]
    fn test_each_session_gets_a_fresh_id() {
        let hello = HelloOk::default();
        let a = SessionInfo::from_hello(&hello, "operator");
        let b = SessionInfo::from_hello(&hello, "operator");
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_connect_result_from_session() {
        let session = SessionInfo::from_hello(&HelloOk::default(), "operator");
        let result = ConnectResult::from(&session);
        assert!(result.connected);
        assert_eq!(result.session_id, session.session_id);

        let value = serde_json::to_value(&result).expect("encode");
        assert!(value.get("sessionId").is_some());
    }
}
