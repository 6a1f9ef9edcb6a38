//! # milady-discovery
//!
//! Finds Milady gateways advertised over DNS-SD (`_openclaw-gw._tcp` in
//! `local.`), resolves each advertisement into a
//! [`DiscoveredGateway`](milady_proto::DiscoveredGateway) keyed by a stable
//! id, and publishes found/updated/lost changes on the shared
//! [`EventBus`](milady_gateway::EventBus).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod advert;
pub mod browser;
pub mod error;
#[cfg(feature = "mdns")]
pub mod mdns;
pub mod names;
pub mod service;

pub use advert::{Advertisement, parse_bool};
pub use browser::{BrowseEvent, ManualBrowser, ServiceBrowser};
pub use error::{DiscoveryError, Result};
#[cfg(feature = "mdns")]
pub use mdns::MdnsBrowser;
pub use names::{decode_service_name, normalize_name, stable_id};
pub use service::{
    DiscoveryConfig, DiscoveryResult, DiscoveryService, STATUS_DISCOVERING, STATUS_STOPPED,
};
