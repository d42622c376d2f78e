//! `serve` command: run the WebSocket server in the foreground.
//!
//! Wires the filesystem installation source and the HTTP rebuilder into
//! the dispatcher, binds the listener and serves until SIGTERM/SIGINT.

use std::sync::Arc;

use tracing::info;

use vencord_installer_discord::fs::FsSource;
use vencord_installer_discord::rebuild::HttpRebuilder;
use vencord_installer_server::{Dispatcher, Server, SignalHandler};

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Starts the server and blocks until a shutdown signal arrives.
pub async fn run(config: &Config) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let source = FsSource::new(config.source_config());
    info!(
        roots = ?source.config().search_roots,
        patcher = %source.config().patcher_path().display(),
        "Discovery configured"
    );

    let rebuilder = HttpRebuilder::new(config.dist_dir())?;
    info!(
        dist = %rebuilder.dist_dir().display(),
        artifacts = rebuilder.artifacts().len(),
        "Rebuild configured"
    );

    let dispatcher = Dispatcher::new(Arc::new(source), Arc::new(rebuilder));

    let server = Server::bind(config.server_config(), dispatcher).await?;

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    server
        .run_until_shutdown(signal_handler.shutdown().wait())
        .await?;

    info!("Server stopped");
    Ok(())
}
