//! Command implementations.

mod call;
mod connect;
mod discover;
mod watch;

pub use call::CallCommand;
pub use connect::ConnectCommand;
pub use discover::DiscoverCommand;
pub use watch::WatchCommand;

use milady_gateway::{ConnectResult, EventBus, GatewayConnection};
use tracing::info;

use crate::config::CliConfig;
use crate::error::CliError;

/// Open a WebSocket session with the configured gateway.
async fn open_session(
    config: &CliConfig,
    bus: EventBus,
) -> Result<(GatewayConnection, ConnectResult), CliError> {
    let connection = GatewayConnection::websocket(bus);
    let result = connection.connect(config.connect_options()).await?;
    info!(url = %config.url, session_id = %result.session_id, "connected");
    Ok((connection, result))
}
