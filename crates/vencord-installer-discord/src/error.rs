//! Error types for installation operations.
//!
//! The `Display` text of an [`InstallError`] is sent verbatim to the
//! browser client, so messages are written for end users.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for installation operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// An error raised while inspecting or modifying an installation.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Filesystem operation failed.
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        /// What was being attempted ("rename", "write", ...).
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file the operation depends on does not exist.
    #[error("{what} not found at {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The component is already installed.
    #[error("{0} is already installed")]
    AlreadyInstalled(&'static str),

    /// The component is not installed.
    #[error("{0} is not installed")]
    NotInstalled(&'static str),

    /// The patcher has not been downloaded yet.
    #[error("Vencord files are missing ({}). Try repairing first", path.display())]
    PatcherMissing { path: PathBuf },

    /// Downloading a build artifact failed.
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl InstallError {
    /// Wraps an IO error with the action and path it happened on.
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(what: &'static str, path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            what,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a download error.
    pub fn download(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Extension trait to attach an action and path to `io::Result`s.
#[cfg_attr(not(feature = "fs"), allow(dead_code))]
pub(crate) trait IoContext<T> {
    fn context(self, action: &'static str, path: impl AsRef<Path>) -> InstallResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, action: &'static str, path: impl AsRef<Path>) -> InstallResult<T> {
        self.map_err(|e| InstallError::io(action, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = InstallError::io(
            "rename",
            "/opt/discord/resources/app.asar",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to rename /opt/discord/resources/app.asar: permission denied"
        );
    }

    #[test]
    fn state_errors_display() {
        assert_eq!(
            InstallError::AlreadyInstalled("OpenAsar").to_string(),
            "OpenAsar is already installed"
        );
        assert_eq!(
            InstallError::NotInstalled("OpenAsar").to_string(),
            "OpenAsar is not installed"
        );
    }

    #[test]
    fn download_error_display() {
        let err = InstallError::download("https://example.com/patcher.js", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "Failed to download https://example.com/patcher.js: HTTP 404"
        );
    }

    #[test]
    fn io_context_wraps() {
        let result: io::Result<()> = Err(io::Error::from(io::ErrorKind::NotFound));
        let err = result.context("read", "/tmp/x").unwrap_err();
        assert!(matches!(err, InstallError::Io { action: "read", .. }));
    }
}
