//! `connect`: handshake and print the negotiated session.

use std::io::Write;

use milady_gateway::EventBus;

use super::open_session;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Connect command executor.
pub struct ConnectCommand {
    config: CliConfig,
}

impl ConnectCommand {
    /// Create a new connect command.
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Execute the connect command.
    pub async fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let (connection, result) = open_session(&self.config, EventBus::new()).await?;
        connection.disconnect();
        format.write(writer, &result)
    }
}
