//! `call`: send one request and print the response.

use std::io::Write;

use milady_gateway::EventBus;
use serde_json::Value;

use super::open_session;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Call command executor.
pub struct CallCommand {
    config: CliConfig,
}

impl CallCommand {
    /// Create a new call command.
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Parse `--params`; it must be a JSON object.
    pub fn parse_params(params: &str) -> Result<Value, CliError> {
        let value: Value = serde_json::from_str(params)
            .map_err(|e| CliError::InvalidArgument(format!("--params is not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(CliError::InvalidArgument(
                "--params must be a JSON object".to_string(),
            ));
        }
        Ok(value)
    }

    /// Execute the call. The response is printed even when it is an error;
    /// an error response also fails the command.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        method: &str,
        params: &str,
    ) -> Result<(), CliError> {
        let params = Self::parse_params(params)?;
        let (connection, _) = open_session(&self.config, EventBus::new()).await?;
        let result = connection.send(method, params).await;
        connection.disconnect();

        format.write(writer, &result)?;
        match result.error.filter(|_| !result.ok) {
            Some(error) => Err(CliError::Rpc {
                code: error.code,
                message: error.message,
            }),
            None => Ok(()),
        }
    }
}
