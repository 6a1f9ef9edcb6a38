//! Error types for the gateway connection.

use milady_proto::{ProtoError, codes};
use thiserror::Error;

/// Errors surfaced by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The transport could not be opened.
    #[error("gateway connection failed: {0}")]
    ConnectFailed(String),

    /// No hello arrived within the handshake timeout.
    #[error("gateway handshake timed out")]
    HandshakeTimeout,

    /// The gateway refused the handshake.
    #[error("gateway rejected handshake: {code}: {message}")]
    HandshakeRejected {
        /// Error code reported by the gateway.
        code: String,
        /// Error message reported by the gateway.
        message: String,
    },

    /// A request received no response in time.
    #[error("request timed out")]
    RequestTimeout,

    /// No connection is established.
    #[error("not connected to gateway")]
    NotConnected,

    /// The transport closed underneath an operation.
    #[error("connection closed: {0}")]
    TransportClosed(String),

    /// An inbound frame could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The attempt was superseded by `connect()` or `disconnect()`.
    #[error("connection attempt aborted")]
    Aborted,
}

impl GatewayError {
    /// The error code used when this error is reported as an RPC result.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::ConnectFailed(_) | Self::TransportClosed(_) | Self::Aborted => {
                codes::CONNECTION_CLOSED
            }
            Self::HandshakeTimeout | Self::RequestTimeout => codes::TIMEOUT,
            Self::HandshakeRejected { code, .. } => code,
            Self::NotConnected => codes::NOT_CONNECTED,
            Self::MalformedFrame(_) => codes::INVALID_RESPONSE,
        }
    }
}

impl From<ProtoError> for GatewayError {
    fn from(err: ProtoError) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Opening the socket failed.
    #[error("transport connect failed: {0}")]
    Connect(String),

    /// Opening the socket took too long.
    #[error("transport connect timed out")]
    Timeout,

    /// The socket is closed.
    #[error("transport closed")]
    Closed,
}
