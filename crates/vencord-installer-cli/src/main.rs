//! vencord-installer CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use vencord_installer_cli::cli::{Cli, Command, ConfigAction};
use vencord_installer_cli::commands;
use vencord_installer_cli::config::Config;
use vencord_installer_cli::error::{ClientError, ClientResult};
use vencord_installer_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = match (&cli.command, cli.debug) {
        (_, true) => TracingConfig::debug(),
        (None | Some(Command::Serve(_)), false) => TracingConfig::server(),
        _ => TracingConfig::cli(),
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format.into());
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", ClientError::from(e));
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path).map_err(ClientError::Config)?,
        None => Config::load().map_err(ClientError::Config)?,
    };

    match cli.command {
        None => commands::serve::run(&config).await,
        Some(Command::Serve(args)) => {
            config.apply_serve_args(&args);
            commands::serve::run(&config).await
        }
        Some(Command::List { json }) => commands::list::run(&config, json).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
