//! Error types for gateway discovery.

use thiserror::Error;

/// Errors that can occur during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The platform browse could not be started.
    #[error("discovery failed to start: {0}")]
    StartFailed(String),
}

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
