//! Per-connection request loop.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::OwnedSemaphorePermit;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use vencord_installer_protocol::{Envelope, INVALID_DATA, MISSING_NONCE, decode, encode};

use crate::dispatch::Dispatcher;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Reading requests.
    Open,
    /// The peer is gone; the loop has exited.
    Closed,
}

/// One accepted WebSocket connection.
///
/// Requests are handled strictly one at a time: the next frame is not read
/// until the reply to the current one has been written.
pub struct Session {
    ws: WebSocketStream<TcpStream>,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    state: SessionState,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Session {
    pub(crate) fn new(
        ws: WebSocketStream<TcpStream>,
        peer: SocketAddr,
        dispatcher: Dispatcher,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            ws,
            peer,
            dispatcher,
            state: SessionState::Open,
            _permit: permit,
        }
    }

    /// Runs until the peer disconnects or a read fails.
    pub async fn run(mut self) {
        info!(peer = %self.peer, "Client connected");

        while self.state == SessionState::Open {
            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    debug!(peer = %self.peer, error = %e, "Read failed");
                    self.state = SessionState::Closed;
                    continue;
                }
                None => {
                    self.state = SessionState::Closed;
                    continue;
                }
            };

            let reply = match &message {
                Message::Text(text) => reply_to_frame(&self.dispatcher, text.as_bytes()).await,
                Message::Binary(bytes) => reply_to_frame(&self.dispatcher, bytes).await,
                Message::Close(_) => {
                    // Flushes the close reply queued by tungstenite.
                    if let Err(e) = self.ws.close(None).await {
                        debug!(peer = %self.peer, error = %e, "Close handshake incomplete");
                    }
                    self.state = SessionState::Closed;
                    continue;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            self.send(&reply).await;
        }

        info!(peer = %self.peer, "Client disconnected");
    }

    async fn send(&mut self, reply: &Envelope) {
        let text = match encode(reply) {
            Ok(text) => text,
            Err(e) => {
                warn!(peer = %self.peer, nonce = %reply.nonce, error = %e, "Failed to encode reply");
                return;
            }
        };

        match self.ws.send(Message::Text(text)).await {
            Ok(()) => debug!(peer = %self.peer, nonce = %reply.nonce, ok = reply.is_ok(), "Reply sent"),
            Err(e) => {
                warn!(peer = %self.peer, nonce = %reply.nonce, error = %e, "Failed to write reply");
            }
        }
    }
}

/// Builds the reply to one raw frame.
///
/// Undecodable frames and requests without a nonce are answered with an
/// `ERROR` envelope whose nonce is empty; everything else is dispatched.
pub async fn reply_to_frame(dispatcher: &Dispatcher, frame: &[u8]) -> Envelope {
    let request = match decode(frame) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Invalid frame");
            return Envelope::error("", INVALID_DATA);
        }
    };

    if request.nonce.is_empty() {
        debug!(op = %request.op, "Request without nonce");
        return Envelope::error("", MISSING_NONCE);
    }

    dispatcher.dispatch(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::Fixture;
    use serde_json::Value;

    #[tokio::test]
    async fn malformed_frame_gets_invalid_data() {
        let fixture = Fixture::new();
        for frame in [&b"not json"[..], b"[1,2]", b"", br#"{"nonce":5}"#] {
            let reply = reply_to_frame(&fixture.dispatcher, frame).await;
            assert_eq!(reply, Envelope::error("", "Invalid data"));
        }
        assert!(fixture.log.entries().is_empty());
    }

    #[tokio::test]
    async fn missing_nonce_is_rejected() {
        let fixture = Fixture::new();
        for frame in [
            &br#"{"op":"LIST_INSTALLS"}"#[..],
            br#"{"nonce":"","op":"LIST_INSTALLS"}"#,
            br#"{"nonce":null,"op":"PATCH","data":"/opt/discord"}"#,
        ] {
            let reply = reply_to_frame(&fixture.dispatcher, frame).await;
            assert_eq!(reply, Envelope::error("", "Missing Nonce"));
        }
        assert!(fixture.log.entries().is_empty());
    }

    #[tokio::test]
    async fn nonce_is_echoed() {
        let fixture = Fixture::new();
        let reply = reply_to_frame(
            &fixture.dispatcher,
            br#"{"nonce":"abc-123","op":"PATCH","data":"/opt/discord"}"#,
        )
        .await;
        assert_eq!(reply, Envelope::ok("abc-123", Value::Null));

        let reply = reply_to_frame(&fixture.dispatcher, br#"{"nonce":"xyz","op":"FOO"}"#).await;
        assert_eq!(reply, Envelope::error("xyz", "Unknown OP 'FOO'"));
    }

    #[test]
    fn error_reply_has_no_data_key() {
        let text = encode(&Envelope::error("", "Invalid data")).unwrap();
        assert_eq!(text, r#"{"nonce":"","op":"ERROR","message":"Invalid data"}"#);

        let text = encode(&Envelope::ok("1", Value::Null)).unwrap();
        assert_eq!(text, r#"{"nonce":"1","op":"OK","data":null}"#);
    }
}
