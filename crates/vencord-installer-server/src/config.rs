//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::error::{ServerError, ServerResult};

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 18281;

/// Default origin allowed to open connections.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://vencord.dev";

/// Default HTTP path the WebSocket upgrade is served on.
pub const DEFAULT_PATH: &str = "/launch";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,

    /// The single `Origin` header value accepted at handshake time.
    pub allowed_origin: String,

    /// Upgrade path. Requests for any other path get a 404.
    pub path: String,

    /// Maximum concurrently open connections.
    pub max_connections: usize,

    /// Time allowed for a client to complete the WebSocket handshake.
    pub handshake_timeout: Duration,

    /// Upper bound on one operation's collaborator calls. `None` waits forever.
    pub operation_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            path: DEFAULT_PATH.to_string(),
            max_connections: 16,
            handshake_timeout: Duration::from_secs(10),
            operation_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on the given address.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    /// Builder: set the allowed origin.
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = origin.into();
        self
    }

    /// Builder: set the upgrade path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Builder: set max connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Builder: set operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Checks the configuration before binding.
    pub fn validate(&self) -> ServerResult<()> {
        validate_origin(&self.allowed_origin)?;

        if !self.path.starts_with('/') {
            return Err(ServerError::config(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        if self.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        if self.operation_timeout == Some(Duration::ZERO) {
            return Err(ServerError::config("operation_timeout must be positive"));
        }
        Ok(())
    }
}

/// Checks that `origin` is a bare `http`/`https` origin, exactly as a
/// browser sends it in the `Origin` header (no path, no trailing slash).
pub fn validate_origin(origin: &str) -> ServerResult<()> {
    let url = Url::parse(origin)
        .map_err(|e| ServerError::config(format!("invalid allowed origin '{origin}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServerError::config(format!(
            "allowed origin must use http or https: {origin}"
        )));
    }

    let serialized = url.origin().ascii_serialization();
    if serialized != origin {
        return Err(ServerError::config(format!(
            "allowed origin must be a bare origin like '{serialized}', got '{origin}'"
        )));
    }
    Ok(())
}
