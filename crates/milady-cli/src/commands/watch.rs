//! `watch`: stream notifications until Ctrl-C or a deadline.

use std::io::Write;
use std::time::Duration;

use milady_gateway::EventBus;
use tracing::info;

use super::open_session;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Watch command executor.
pub struct WatchCommand {
    config: CliConfig,
}

impl WatchCommand {
    /// Create a new watch command.
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Execute the watch command. The connection reconnects on its own while
    /// watching.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        seconds: Option<u64>,
    ) -> Result<(), CliError> {
        let bus = EventBus::new();
        let mut notifications = bus.subscribe();
        let (connection, _) = open_session(&self.config, bus).await?;

        let deadline = async move {
            match seconds {
                Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let outcome = loop {
            tokio::select! {
                () = &mut deadline => break Ok(()),
                _ = &mut interrupt => {
                    info!("interrupted");
                    break Ok(());
                }
                notification = notifications.recv() => match notification {
                    Some(notification) => {
                        if let Err(e) = format.write_line(writer, &notification) {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
            }
        };

        connection.disconnect();
        outcome
    }
}
