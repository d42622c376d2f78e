//! Installation traits and the filesystem-backed Discord implementation.
//!
//! The WebSocket server only talks to the traits in [`install`]:
//!
//! - [`InstallSource`] discovers installations
//! - [`Installation`] is one discovered installation, addressed by path
//! - [`Rebuilder`] fetches the latest build artifacts before a repair
//!
//! With the `fs` feature (default), [`fs::FsSource`] discovers real Discord
//! installations on disk and patches them by swapping `app.asar` for a small
//! loader shim. With `download` (default), [`rebuild::HttpRebuilder`]
//! downloads build artifacts over HTTPS.
//!
//! # Example
//!
//! ```ignore
//! use vencord_installer_discord::{InstallSource, fs::{FsSource, FsSourceConfig}};
//!
//! async fn list(source: &FsSource) {
//!     for install in source.discover().await {
//!         println!("{} ({})", install.path(), install.branch());
//!     }
//! }
//! ```

pub mod error;
#[cfg(feature = "fs")]
pub mod fs;
pub mod install;
#[cfg(feature = "download")]
pub mod rebuild;

pub use error::{InstallError, InstallResult};
pub use install::{BoxFuture, InstallSource, Installation, Rebuilder};
