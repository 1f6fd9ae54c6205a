//! mrcp CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use mrcp_client::cli::{Cli, Command, ConfigAction};
use mrcp_client::commands;
use mrcp_client::config::ClientConfig;
use mrcp_client::error::{ClientError, ClientResult};
use mrcp_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing = match cli.command {
        Command::Serve { .. } => TracingConfig::server().with_format(TracingOutputFormat::Compact),
        _ => TracingConfig::client(),
    };
    let tracing = if cli.debug || config.debug {
        tracing.with_level(Level::DEBUG)
    } else {
        tracing
    };
    if let Err(e) = init_tracing(tracing.with_wire_trace(cli.wire)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config),
        None => ClientConfig::load().map_err(ClientError::Config),
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    match cli.command {
        Command::Serve {
            bind,
            channels,
            max_connections,
        } => commands::serve::run(bind, &channels, max_connections).await,
        Command::Send {
            server,
            channel,
            method,
            headers,
            body,
            content_type,
            wait_complete,
            timeout,
        } => {
            let args = commands::send::SendArgs {
                server,
                channel,
                method,
                headers,
                body,
                content_type,
                wait_complete,
                timeout,
            };
            commands::send::run(args, &config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
