//! Envelope codec and operation types for the installer's WebSocket API.
//!
//! A browser page talks to the local installer over a single WebSocket
//! connection. Every frame is one JSON [`Envelope`]:
//!
//! - `nonce`: chosen by the sender of a request, echoed in the reply
//! - `op`: an [`Operation`] tag on requests, `OK` or `ERROR` on replies
//! - `data`: operation-specific payload
//! - `message`: human-readable error text, only on `ERROR` replies
//!
//! # Example
//!
//! ```rust
//! use vencord_installer_protocol::{Envelope, Operation, decode, encode};
//!
//! let request = decode(br#"{"nonce":"1","op":"LIST_INSTALLS"}"#).unwrap();
//! assert_eq!(request.operation(), Some(Operation::ListInstalls));
//!
//! let reply = Envelope::error(&request.nonce, "nope");
//! assert_eq!(encode(&reply).unwrap(), r#"{"nonce":"1","op":"ERROR","message":"nope"}"#);
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode, encode};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{Envelope, InstallRecord, Operation};

/// Reply tag for a successful operation.
pub const OP_OK: &str = "OK";

/// Reply tag for a failed operation.
pub const OP_ERROR: &str = "ERROR";

/// Maximum accepted frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Error message for frames that are not a valid envelope.
pub const INVALID_DATA: &str = "Invalid data";

/// Error message for requests without a nonce.
pub const MISSING_NONCE: &str = "Missing Nonce";
