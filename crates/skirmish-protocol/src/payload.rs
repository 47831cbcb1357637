//! Payload shapes for the session-level notifies.
//!
//! Each struct is the `value` of one (or two related) notify ids; the
//! game broadcasts reuse the state machine's own types, see `game.rs`.

use serde::{Deserialize, Serialize};

use crate::RoomId;

/// `ClientVersion` (301) and `ServerVersion` (101).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: u32,
}

/// `SignIn` (302): take a seat in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignIn {
    /// Unique within the room.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether this side answers its own requests. Untrusted seats get
    /// server-chosen defaults.
    #[serde(default = "default_trusted")]
    pub trusted: bool,
}

fn default_trusted() -> bool {
    true
}

/// `Reconnect` (303): re-bind a new connection to an existing seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconnect {
    pub name: String,
    /// The identifier handed out in [`SignedIn`].
    pub connection_id: String,
}

/// `SignedIn` (102): sent to the new seat only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIn {
    pub room_id: RoomId,
    pub seat: u8,
    /// Keep this to reconnect.
    pub connection_id: String,
}

/// `PlayerAdded` (103).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAdded {
    pub name: String,
    pub display_name: String,
    pub seat: u8,
}

/// `PlayerRemoved` (104).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRemoved {
    pub name: String,
}

/// `SessionStateChanged` (201).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub name: String,
    pub online: bool,
    pub trusted: bool,
}

/// `SetSessionState` (304).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSessionState {
    pub trusted: bool,
}

/// `SendChat` (401) inbound and `Chat` (202) relayed.
///
/// `from` is filled in by the server when relaying; whatever the client
/// put there is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub text: String,
}

/// Error codes carried by [`ErrorNotice`], HTTP-flavoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ErrorCode {
    /// The packet could not be understood.
    BadRequest,
    /// Reconnect named an unknown seat or identifier.
    UnknownSession,
    /// The name is taken in every open room.
    NameTaken,
    /// The first packet was not a compatible `ClientVersion`.
    VersionMismatch,
    /// The room could not be reached.
    Unavailable,
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::BadRequest => 400,
            ErrorCode::UnknownSession => 404,
            ErrorCode::NameTaken => 409,
            ErrorCode::VersionMismatch => 426,
            ErrorCode::Unavailable => 503,
        }
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            400 => Ok(Self::BadRequest),
            404 => Ok(Self::UnknownSession),
            409 => Ok(Self::NameTaken),
            426 => Ok(Self::VersionMismatch),
            503 => Ok(Self::Unavailable),
            other => Err(format!("unknown error code {other}")),
        }
    }
}

/// `Error` (112).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorNotice {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
