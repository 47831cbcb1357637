//! Error types for the room layer.

use skirmish_logic::LogicError;
use skirmish_protocol::RoomId;
use skirmish_rules::RuleError;

use crate::RoomState;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Another seat already uses this name.
    #[error("name {name} is taken in room {room_id}")]
    NameTaken { name: String, room_id: RoomId },

    /// No seat has this name.
    #[error("player {name} not in room {room_id}")]
    NotInRoom { name: String, room_id: RoomId },

    /// The room's lifecycle state does not allow the operation, e.g.
    /// joining a game already in progress.
    #[error("room {room_id} is {state}")]
    InvalidState { room_id: RoomId, state: RoomState },

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Logic(#[from] LogicError),
}
