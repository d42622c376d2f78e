//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding or encoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds the maximum allowed size.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame is not a well-formed envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    /// Failed to serialize an envelope or payload to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}
