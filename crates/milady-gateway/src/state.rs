//! Connection state types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the gateway connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected, and not trying to be.
    #[default]
    Disconnected,
    /// Opening the transport or waiting for the hello.
    Connecting,
    /// Handshake complete; requests may be sent.
    Connected,
    /// Connection lost, a retry is scheduled.
    Reconnecting,
}

impl ConnectionState {
    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    /// Title and body of the status line shown while in this state.
    #[must_use]
    pub const fn summary(self) -> StatusSummary {
        match self {
            Self::Connected => StatusSummary {
                title: "Milady Gateway · Connected",
                text: "WebSocket connection active",
            },
            Self::Reconnecting => StatusSummary {
                title: "Milady Gateway · Reconnecting",
                text: "Attempting to restore connection…",
            },
            Self::Connecting => StatusSummary {
                title: "Milady Gateway",
                text: "Connecting…",
            },
            Self::Disconnected => StatusSummary {
                title: "Milady Gateway",
                text: "Disconnected",
            },
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable status for a connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSummary {
    /// Short title.
    pub title: &'static str,
    /// Longer description.
    pub text: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_names() {
        assert_eq!(ConnectionState::Disconnected.as_str(), "disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
        assert_eq!(ConnectionState::Reconnecting.as_str(), "reconnecting");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connection_state_serde() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).expect("encode");
        assert_eq!(json, r#""reconnecting""#);
        let back: ConnectionState = serde_json::from_str(r#""connected""#).expect("decode");
        assert_eq!(back, ConnectionState::Connected);
    }

    #[test]
    fn test_status_summary() {
        let summary = ConnectionState::Connected.summary();
        assert_eq!(summary.title, "Milady Gateway · Connected");
        assert_eq!(summary.text, "WebSocket connection active");

        let summary = ConnectionState::Reconnecting.summary();
        assert_eq!(summary.title, "Milady Gateway · Reconnecting");

        assert_eq!(ConnectionState::Disconnected.summary().text, "Disconnected");
    }
}
