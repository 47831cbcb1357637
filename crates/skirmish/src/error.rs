//! Unified error type for the skirmish server.

use skirmish_protocol::ProtocolError;
use skirmish_room::RoomError;
use skirmish_session::SessionError;
use skirmish_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    /// Connection, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes that are not a well-formed packet, or a packet that is not
    /// acceptable at this point of the conversation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Unknown or mismatched connection identifier.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Room full, gone, or in the wrong state; also invalid rules.
    #[error(transparent)]
    Room(#[from] RoomError),
}
