//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the envelope were wrong,
//! never the network or the game rules.

use crate::{Namespace, NotifyId};

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: not JSON, or not a well-formed packet.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope is JSON but breaks the packet rules: unknown type,
    /// unknown id, or the wrong id field set for its kind.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The payload does not have the shape fixed for its id.
    #[error("invalid payload for {id}: {source}")]
    InvalidPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// A notify arrived from a namespace the receiver does not accept.
    #[error("notify {id:?} is in the {namespace:?} namespace")]
    UnexpectedNamespace { id: NotifyId, namespace: Namespace },

    /// The message is valid but not acceptable right now: the wrong
    /// protocol version, a reply when none is expected, and so on.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
