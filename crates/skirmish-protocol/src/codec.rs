//! Codec trait and implementations for serializing/deserializing packets.
//!
//! The rest of the server never touches `serde_json` directly for
//! envelopes: it asks a [`Codec`]. Only [`JsonCodec`] exists today; the
//! wire format is JSON by contract.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Packet, ProtocolError};

/// Encodes Rust types to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes one packet.
    fn encode_packet(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        self.encode(packet)
    }

    /// Decodes one packet. Anything that is not a well-formed envelope is
    /// an error; the caller closes the connection.
    fn decode_packet(&self, data: &[u8]) -> Result<Packet, ProtocolError> {
        self.decode(data)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use skirmish_protocol::{Codec, JsonCodec, NotifyId, Packet, Version};
///
/// let codec = JsonCodec;
/// let packet = Packet::notify(NotifyId::ClientVersion, &Version { version: 1 }).unwrap();
///
/// let bytes = codec.encode_packet(&packet).unwrap();
/// let decoded = codec.decode_packet(&bytes).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NotifyId, RequestId};

    #[test]
    fn test_json_codec_packet_round_trip() {
        let codec = JsonCodec;
        let packet = Packet::Reply {
            id: RequestId::OrderClaim,
            value: serde_json::json!([2, 3]),
        };
        let bytes = codec.encode_packet(&packet).unwrap();
        assert_eq!(codec.decode_packet(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let err = JsonCodec.decode_packet(b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_json_codec_decode_non_object_is_error() {
        assert!(JsonCodec.decode_packet(b"[1, 2, 3]").is_err());
        assert!(JsonCodec.decode_packet(b"42").is_err());
    }

    #[test]
    fn test_json_codec_encodes_camel_case_envelope() {
        let packet = Packet::notify_value(NotifyId::PlayerRemoved, serde_json::json!({"name": "a"}));
        let bytes = JsonCodec.encode_packet(&packet).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], 3);
        assert_eq!(json["notifyId"], 104);
        assert_eq!(json["requestId"], 0);
        assert_eq!(json["value"]["name"], "a");
    }
}
