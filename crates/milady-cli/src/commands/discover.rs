//! `discover`: browse the local network and print what answered.

use std::io::Write;
use std::time::Duration;

use milady_discovery::{DiscoveryService, MdnsBrowser, ServiceBrowser};
use milady_gateway::EventBus;

use crate::config::CliConfig;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Discover command executor.
pub struct DiscoverCommand {
    config: CliConfig,
}

impl DiscoverCommand {
    /// Create a new discover command.
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Browse over mDNS for `seconds`.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        seconds: u64,
    ) -> Result<(), CliError> {
        self.execute_with(MdnsBrowser::new(), writer, format, seconds)
            .await
    }

    /// Browse with any browser for `seconds`, at least one settle window.
    pub async fn execute_with<B, W>(
        &self,
        browser: B,
        writer: &mut W,
        format: &OutputFormat,
        seconds: u64,
    ) -> Result<(), CliError>
    where
        B: ServiceBrowser,
        W: Write,
    {
        let config = self.config.discovery_config();
        let remaining = Duration::from_secs(seconds).saturating_sub(config.settle);
        let service = DiscoveryService::with_config(browser, EventBus::new(), config);

        service.start_discovery().await?;
        tokio::time::sleep(remaining).await;
        let result = service.get_discovered_gateways();
        service.stop_discovery();

        format.write(writer, &result)
    }
}
