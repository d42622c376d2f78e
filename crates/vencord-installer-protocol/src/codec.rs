//! JSON codec for envelopes.
//!
//! Each WebSocket frame holds exactly one JSON object, so the codec has no
//! framing of its own beyond a size check.

use serde::de::Error as _;
use serde_json::Value;

use crate::MAX_FRAME_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::Envelope;

/// Decodes one frame into an envelope.
///
/// Never panics on arbitrary input. Missing `nonce`/`op` keys decode to
/// empty strings; anything that is not a JSON object, or has mistyped
/// fields, is an [`ProtocolError::InvalidEnvelope`].
///
/// # Example
///
/// ```rust
/// use vencord_installer_protocol::decode;
///
/// let envelope = decode(br#"{"nonce":"a","op":"PATCH","data":"/opt/discord"}"#).unwrap();
/// assert_eq!(envelope.string_payload(), Some("/opt/discord"));
///
/// assert!(decode(b"not json").is_err());
/// ```
pub fn decode(frame: &[u8]) -> ProtocolResult<Envelope> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let value: Value = serde_json::from_slice(frame).map_err(ProtocolError::InvalidEnvelope)?;
    if !value.is_object() {
        return Err(ProtocolError::InvalidEnvelope(serde_json::Error::custom(
            "envelope must be a JSON object",
        )));
    }

    serde_json::from_value(value).map_err(ProtocolError::InvalidEnvelope)
}

/// Encodes an envelope as a JSON text frame.
pub fn encode(envelope: &Envelope) -> ProtocolResult<String> {
    serde_json::to_string(envelope).map_err(ProtocolError::Serialization)
}
