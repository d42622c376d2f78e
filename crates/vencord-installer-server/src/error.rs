//! Server error types.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;
use vencord_installer_discord::InstallError;
use vencord_installer_protocol::{Operation, ProtocolError};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the transport side of the server.
///
/// None of these reach the peer as an envelope; they are logged.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on the listener or a connection.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Could not bind the listening socket.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// WebSocket handshake or transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The client did not finish the handshake in time.
    #[error("Handshake with {peer} timed out after {}s", .timeout.as_secs())]
    HandshakeTimeout { peer: SocketAddr, timeout: Duration },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The server is shutting down.
    #[error("Server shutdown requested")]
    Shutdown,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Failure of a single request. The `Display` text is the `message` of the
/// `ERROR` reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The `op` tag names no known operation.
    #[error("Unknown OP '{0}'")]
    UnknownOp(String),

    /// A path-addressed operation got a non-string payload.
    #[error("Expected data to be string")]
    ExpectedString,

    /// No discovered installation has the requested path.
    #[error("No such Discord install: {0}")]
    NoSuchInstall(String),

    /// The operation exceeded the configured timeout.
    #[error("Operation {op} timed out after {}ms", .limit.as_millis())]
    Timeout { op: Operation, limit: Duration },

    /// The collaborator failed; its message is passed through.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The reply payload could not be serialized.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_messages() {
        assert_eq!(
            DispatchError::UnknownOp("FOO".into()).to_string(),
            "Unknown OP 'FOO'"
        );
        assert_eq!(
            DispatchError::ExpectedString.to_string(),
            "Expected data to be string"
        );
        assert_eq!(
            DispatchError::NoSuchInstall("/nope".into()).to_string(),
            "No such Discord install: /nope"
        );
        assert_eq!(
            DispatchError::Timeout {
                op: Operation::Repair,
                limit: Duration::from_millis(250),
            }
            .to_string(),
            "Operation REPAIR timed out after 250ms"
        );
    }

    #[test]
    fn install_errors_pass_through() {
        let err = DispatchError::from(InstallError::AlreadyInstalled("OpenAsar"));
        assert_eq!(err.to_string(), "OpenAsar is already installed");
    }
}
