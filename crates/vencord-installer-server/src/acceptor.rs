//! TCP listener and origin-gated WebSocket handshake.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};

use vencord_installer_protocol::MAX_FRAME_SIZE;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::session::Session;

/// Decides whether a handshake request may be upgraded.
#[derive(Debug, Clone)]
pub struct HandshakeGate {
    path: String,
    allowed_origin: String,
}

impl HandshakeGate {
    /// Creates a gate for one path and one allowed origin.
    pub fn new(path: impl Into<String>, allowed_origin: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            allowed_origin: allowed_origin.into(),
        }
    }

    /// Returns `Err` with the HTTP status to refuse the upgrade with.
    ///
    /// The `Origin` header must equal the allowed origin byte for byte.
    pub fn check(&self, request: &Request) -> Result<(), StatusCode> {
        if request.uri().path() != self.path {
            return Err(StatusCode::NOT_FOUND);
        }

        let origin = request
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        if origin != Some(self.allowed_origin.as_str()) {
            warn!(origin = ?origin, "Rejected connection from disallowed origin");
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(())
    }
}

/// WebSocket server bound to a TCP address.
pub struct Server {
    config: Arc<ServerConfig>,
    listener: TcpListener,
    dispatcher: Dispatcher,
    connection_semaphore: Arc<Semaphore>,
}

impl Server {
    /// Validates the configuration and binds the listener.
    pub async fn bind(config: ServerConfig, dispatcher: Dispatcher) -> ServerResult<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            path = %config.path,
            origin = %config.allowed_origin,
            "WebSocket server listening"
        );

        let dispatcher = dispatcher.with_operation_timeout(config.operation_timeout);
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Ok(Self {
            config: Arc::new(config),
            listener,
            dispatcher,
            connection_semaphore,
        })
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts one TCP connection, waiting for a free connection slot first.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .connection_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::Shutdown)?;

        let (stream, peer) = self.listener.accept().await?;
        debug!(peer = %peer, "Accepted TCP connection");

        Ok(Connection {
            stream,
            peer,
            config: self.config.clone(),
            dispatcher: self.dispatcher.clone(),
            permit,
        })
    }

    /// Runs the accept loop. Each connection is upgraded and served on its
    /// own task.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            match self.accept().await {
                Ok(connection) => {
                    tokio::spawn(connection.serve());
                }
                Err(ServerError::Shutdown) => return Err(ServerError::Shutdown),
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep running on their own tasks.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}

/// An accepted TCP connection that has not been upgraded yet.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    dispatcher: Dispatcher,
    permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Performs the gated WebSocket handshake.
    pub async fn upgrade(self) -> ServerResult<Session> {
        let gate = HandshakeGate::new(&self.config.path, &self.config.allowed_origin);
        let callback = |request: &Request, response: Response| match gate.check(request) {
            Ok(()) => Ok(response),
            Err(status) => Err(refusal(status)),
        };

        let ws_config = WebSocketConfig {
            max_message_size: Some(MAX_FRAME_SIZE),
            max_frame_size: Some(MAX_FRAME_SIZE),
            ..Default::default()
        };

        let timeout = self.config.handshake_timeout;
        let ws = tokio::time::timeout(
            timeout,
            accept_hdr_async_with_config(self.stream, callback, Some(ws_config)),
        )
        .await
        .map_err(|_| ServerError::HandshakeTimeout {
            peer: self.peer,
            timeout,
        })??;

        Ok(Session::new(ws, self.peer, self.dispatcher, Some(self.permit)))
    }

    /// Upgrades and serves the connection until the peer goes away.
    /// Handshake failures are logged and end only this connection.
    pub async fn serve(self) {
        let peer = self.peer;
        match self.upgrade().await {
            Ok(session) => session.run().await,
            Err(e) => debug!(peer = %peer, error = %e, "WebSocket handshake failed"),
        }
    }
}

fn refusal(status: StatusCode) -> ErrorResponse {
    let mut response = ErrorResponse::new(status.canonical_reason().map(str::to_string));
    *response.status_mut() = status;
    response
}
