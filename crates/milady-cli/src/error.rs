//! CLI error types.

use std::fmt;

use milady_discovery::DiscoveryError;
use milady_gateway::GatewayError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// Connecting to the gateway failed.
    Connection(GatewayError),
    /// The gateway answered a request with an error.
    Rpc {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
    /// Discovery could not start.
    Discovery(DiscoveryError),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Rpc { code, message } => write!(f, "gateway error {code}: {message}"),
            Self::Discovery(e) => write!(f, "discovery error: {e}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        Self::Connection(err)
    }
}

impl From<DiscoveryError> for CliError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_display_rpc() {
        let err = CliError::Rpc {
            code: "NOT_CONNECTED".into(),
            message: "Not connected to gateway".into(),
        };
        assert_eq!(err.to_string(), "gateway error NOT_CONNECTED: Not connected to gateway");
    }

    #[test]
    fn test_connection_keeps_source() {
        let err = CliError::from(GatewayError::NotConnected);
        assert!(err.to_string().starts_with("connection error: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(matches!(CliError::from(io_err), CliError::Io(_)));
    }
}
