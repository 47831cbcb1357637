//! The server's record of one seat's connection.

use std::time::Instant;

use skirmish_protocol::RoomId;

/// Whether a seat currently has a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    /// The connection dropped; the seat is kept for a reconnect.
    Disconnected { since: Instant },
}

/// One seat's connection record.
///
/// `link` is the transport-level id of the connection currently bound to
/// the seat. Disconnect notices from an older link are recognised as
/// stale and ignored.
#[derive(Debug, Clone)]
pub struct Session {
    /// 32 hex chars, handed to the client in `SignedIn`.
    pub connection_id: String,
    pub player: String,
    pub room_id: RoomId,
    pub state: SessionState,
    pub link: u64,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
