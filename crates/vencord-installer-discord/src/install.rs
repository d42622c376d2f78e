//! Installation traits.
//!
//! These are the only capabilities the WebSocket server needs from the
//! installation layer. Implementations must be `Send + Sync`; every method
//! that touches the disk or network returns a [`BoxFuture`] so the traits
//! stay object-safe.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use vencord_installer_core::Branch;

use crate::error::InstallResult;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One discovered installation.
///
/// The state accessors describe the installation at discovery time. Handles
/// are cheap snapshots: callers re-run discovery instead of caching them.
pub trait Installation: Send + Sync + fmt::Debug {
    /// Stable path identifying the installation.
    fn path(&self) -> &str;

    /// Release branch.
    fn branch(&self) -> Branch;

    /// Whether the Vencord patch is applied.
    fn is_patched(&self) -> bool;

    /// Whether the OpenAsar loader is installed.
    fn is_openasar(&self) -> bool;

    /// Applies the patch. Re-patching an already patched install refreshes
    /// the loader shim.
    fn patch(&self) -> BoxFuture<'_, InstallResult<()>>;

    /// Removes the patch.
    fn unpatch(&self) -> BoxFuture<'_, InstallResult<()>>;

    /// Installs the OpenAsar loader.
    fn install_openasar(&self) -> BoxFuture<'_, InstallResult<()>>;

    /// Removes the OpenAsar loader, restoring the original asar.
    fn uninstall_openasar(&self) -> BoxFuture<'_, InstallResult<()>>;
}

/// Discovers installations.
pub trait InstallSource: Send + Sync {
    /// Returns every installation currently present.
    ///
    /// Discovery does not fail as a whole: locations that cannot be read
    /// are skipped.
    fn discover(&self) -> BoxFuture<'_, Vec<Box<dyn Installation>>>;
}

/// Fetches the latest build artifacts that a patched installation loads.
pub trait Rebuilder: Send + Sync {
    /// Downloads and installs the latest artifacts.
    fn rebuild(&self) -> BoxFuture<'_, InstallResult<()>>;
}
