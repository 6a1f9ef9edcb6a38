//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Milady gateway client.
#[derive(Parser, Debug, Clone)]
#[command(name = "milady")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Gateway URL, overriding the config file.
    #[arg(short, long, global = true, env = "MILADY_GATEWAY_URL")]
    pub gateway: Option<String>,

    /// Config file (defaults to ~/.config/milady/gateway.toml when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Bearer token for the handshake.
    #[arg(long, global = true, env = "MILADY_GATEWAY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Password for the handshake.
    #[arg(long, global = true, env = "MILADY_GATEWAY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable output.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Connect, print the negotiated session and disconnect.
    Connect,

    /// Send one request and print the response.
    Call {
        /// Method name, e.g. `health`.
        method: String,

        /// Request parameters as a JSON object.
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Stream connection state and gateway events.
    Watch {
        /// Stop after this many seconds (runs until Ctrl-C otherwise).
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Browse the local network for gateways.
    Discover {
        /// How long to browse.
        #[arg(short, long, default_value_t = 3)]
        seconds: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_call_with_params() {
        let cli = Cli::parse_from(["milady", "call", "chat.send", "--params", r#"{"text":"hi"}"#]);
        match cli.command {
            Commands::Call { method, params } => {
                assert_eq!(method, "chat.send");
                assert_eq!(params, r#"{"text":"hi"}"#);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_call_params_default_to_empty_object() {
        let cli = Cli::parse_from(["milady", "call", "health"]);
        assert!(matches!(cli.command, Commands::Call { ref params, .. } if params == "{}"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "milady",
            "watch",
            "--seconds",
            "5",
            "-g",
            "ws://gw.local:18789",
            "--format",
            "json",
            "--log-json",
        ]);
        assert_eq!(cli.gateway.as_deref(), Some("ws://gw.local:18789"));
        assert_eq!(cli.format, Format::Json);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Watch { seconds: Some(5) }));
    }

    #[test]
    fn test_discover_defaults() {
        let cli = Cli::parse_from(["milady", "discover"]);
        assert!(matches!(cli.command, Commands::Discover { seconds: 3 }));
        assert_eq!(cli.format, Format::Table);
    }
}
