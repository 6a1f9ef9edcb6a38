//! Notification types published on the event bus.

use milady_proto::DiscoveryEvent;
use serde::Serialize;
use serde_json::Value;

use crate::state::ConnectionState;

/// A notification delivered to bus listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// The connection state changed.
    StateChange {
        /// New state.
        state: ConnectionState,
        /// Why the state changed, when known.
        reason: Option<String>,
    },
    /// The gateway pushed an event.
    GatewayEvent {
        /// Event name.
        event: String,
        /// Event payload.
        payload: Option<Value>,
        /// Server sequence number.
        seq: Option<u64>,
    },
    /// Something went wrong.
    Error {
        /// Description.
        message: String,
        /// Whether a reconnect has been scheduled.
        #[serde(rename = "willRetry")]
        will_retry: bool,
    },
    /// The set of discovered gateways changed.
    Discovery(DiscoveryEvent),
}

impl Notification {
    /// Notification kind, as used on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StateChange { .. } => "stateChange",
            Self::GatewayEvent { .. } => "gatewayEvent",
            Self::Error { .. } => "error",
            Self::Discovery(_) => "discovery",
        }
    }

    pub(crate) fn state(state: ConnectionState, reason: Option<String>) -> Self {
        Self::StateChange { state, reason }
    }
}
