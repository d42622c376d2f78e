//! CLI error types.

use std::fmt;

use vencord_installer_core::TracingError;
use vencord_installer_discord::InstallError;
use vencord_installer_server::ServerError;

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Server failed to start or stopped with an error.
    Server(ServerError),
    /// Installation layer error.
    Install(InstallError),
    /// Logging could not be initialized.
    Tracing(TracingError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Server(err) => write!(f, "server error: {}", err),
            Self::Install(err) => write!(f, "install error: {}", err),
            Self::Tracing(err) => write!(f, "logging error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Server(err) => Some(err),
            Self::Install(err) => Some(err),
            Self::Tracing(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Server(err)
    }
}

impl From<InstallError> for ClientError {
    fn from(err: InstallError) -> Self {
        Self::Install(err)
    }
}

impl From<TracingError> for ClientError {
    fn from(err: TracingError) -> Self {
        Self::Tracing(err)
    }
}
