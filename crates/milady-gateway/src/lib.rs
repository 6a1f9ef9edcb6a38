//! # milady-gateway
//!
//! Client connector for the Milady gateway: one persistent socket carrying
//! request/response calls and server-pushed events, with automatic recovery
//! from transport loss.
//!
//! ```no_run
//! use milady_gateway::{ConnectOptions, EventBus, GatewayConnection};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), milady_gateway::GatewayError> {
//! let conn = GatewayConnection::websocket(EventBus::new());
//! let session = conn
//!     .connect(ConnectOptions::new("ws://127.0.0.1:18789", "milady-desktop", "1.0.0"))
//!     .await?;
//! println!("connected, protocol {}", session.protocol);
//!
//! let result = conn.send("health", json!({})).await;
//! println!("ok = {}", result.ok);
//! conn.disconnect();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod pending;
pub mod reconnect;
pub mod rpc;
pub mod session;
pub mod state;
pub mod transport;

pub use bus::{EventBus, ListenerId};
pub use config::{ConnectOptions, ConnectionConfig, HELLO_TIMEOUT, REQUEST_TIMEOUT};
pub use error::{GatewayError, TransportError};
pub use events::Notification;
pub use manager::{CLIENT_DISCONNECT, GatewayConnection};
pub use reconnect::{Backoff, ReconnectConfig};
pub use rpc::RpcResult;
pub use session::{ConnectResult, SessionInfo};
pub use state::{ConnectionState, StatusSummary};
pub use transport::{
    MemoryListener, MemoryTransport, OutboundMessage, Transport, TransportEvent, TransportLink,
    TransportPeer, TransportSender, WsTransport,
};
