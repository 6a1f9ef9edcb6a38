//! # milady-proto
//!
//! Protocol definitions for the Milady gateway connector: the JSON frames
//! exchanged over the gateway socket, the `connect` handshake payloads, and
//! the data model for gateways found on the local network.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codes;
pub mod discovery;
pub mod error;
pub mod frames;
pub mod handshake;

pub use discovery::{
    DEFAULT_DOMAIN, DiscoveredGateway, DiscoveryEvent, DiscoveryEventKind, SERVICE_TYPE,
};
pub use error::ProtoError;
pub use frames::{ErrorShape, EventFrame, Frame, RequestFrame, ResponseFrame};
pub use handshake::{
    AuthParams, CONNECT_METHOD, ClientInfo, ConnectParams, HelloAuth, HelloFeatures, HelloOk,
    PROTOCOL_VERSION,
};
