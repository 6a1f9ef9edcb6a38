//! # milady-cli
//!
//! Command-line client for Milady gateways.
//!
//! - `connect`: run the handshake and print the negotiated session
//! - `call`: send one request and print the response
//! - `watch`: stream connection and gateway notifications
//! - `discover`: browse the local network for gateways
//!
//! Settings come from a TOML file (`~/.config/milady/gateway.toml` by
//! default), overridden by flags and `MILADY_GATEWAY_*` environment
//! variables.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use config::CliConfig;
pub use error::CliError;
pub use output::{OutputFormat, TableDisplay};
