//! Origin-gated WebSocket server for the Vencord installer.
//!
//! This crate accepts WebSocket connections from the Vencord website and
//! lets it drive local installation operations:
//! - TCP listener with an `Origin`/path gate at handshake time
//! - Sequential per-connection request loop with nonce correlation
//! - Dispatch of `LIST_INSTALLS`, `PATCH`, `UNPATCH`, `REPAIR`,
//!   `INSTALL_OPENASAR` and `UNINSTALL_OPENASAR` to the installation traits
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vencord_installer_discord::fs::{FsSource, FsSourceConfig};
//! use vencord_installer_discord::rebuild::HttpRebuilder;
//! use vencord_installer_server::{Dispatcher, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FsSource::new(FsSourceConfig::new("/var/lib/vencord/dist"));
//!     let rebuilder = HttpRebuilder::new("/var/lib/vencord/dist")?;
//!     let dispatcher = Dispatcher::new(Arc::new(source), Arc::new(rebuilder));
//!
//!     let server = Server::bind(ServerConfig::default(), dispatcher).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod acceptor;
mod config;
mod dispatch;
mod error;
mod session;
mod signals;

pub use acceptor::{Connection, HandshakeGate, Server};
pub use config::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_PATH, DEFAULT_PORT, ServerConfig, validate_origin,
};
pub use dispatch::{Dispatcher, install_record};
pub use error::{DispatchError, ServerError, ServerResult};
pub use session::{Session, reply_to_frame};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
