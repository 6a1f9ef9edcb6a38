//! Milady CLI binary entrypoint.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use milady_cli::commands::{CallCommand, ConnectCommand, DiscoverCommand, WatchCommand};
use milady_cli::{Cli, CliConfig, CliError, Commands, OutputFormat};

const DEFAULT_LOG_FILTER: &str = "milady=info";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = io::stdout().lock();
    match runtime.block_on(run(cli, &mut stdout)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run<W: Write>(cli: Cli, writer: &mut W) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let config = CliConfig::resolve(&cli)?;

    match cli.command {
        Commands::Connect => {
            ConnectCommand::new(config).execute(writer, &format).await?;
        }
        Commands::Call { method, params } => {
            CallCommand::new(config)
                .execute(writer, &format, &method, &params)
                .await?;
        }
        Commands::Watch { seconds } => {
            WatchCommand::new(config)
                .execute(writer, &format, seconds)
                .await?;
        }
        Commands::Discover { seconds } => {
            DiscoverCommand::new(config)
                .execute(writer, &format, seconds)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_connect_without_gateway_fails() {
        let cli = Cli::parse_from(["milady", "-g", "ws://127.0.0.1:1", "connect"]);
        let mut out = Vec::new();
        let result = run(cli, &mut out).await;
        assert!(matches!(result, Err(CliError::Connection(_))));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_with_invalid_gateway_fails() {
        let cli = Cli::parse_from(["milady", "-g", "http://invalid", "connect"]);
        let result = run(cli, &mut Vec::new()).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[tokio::test]
    async fn run_call_with_bad_params_fails_before_connecting() {
        let cli = Cli::parse_from(["milady", "-g", "ws://127.0.0.1:1", "call", "health", "-p", "nope"]);
        let result = run(cli, &mut Vec::new()).await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
