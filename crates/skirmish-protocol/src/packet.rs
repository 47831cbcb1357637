//! The packet envelope and its identifiers.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room (a game instance).
///
/// Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Kinds and identifiers
// ---------------------------------------------------------------------------

/// The three kinds of packet. `0` is never valid on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Server → agent, demands exactly one reply with the same id.
    Request = 1,
    /// Agent → server, answers the pending request.
    Reply = 2,
    /// Fire-and-forget, either direction.
    Notify = 3,
}

impl TryFrom<u8> for PacketKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Request),
            2 => Ok(Self::Reply),
            3 => Ok(Self::Notify),
            other => Err(ProtocolError::MalformedEnvelope(format!(
                "unknown packet type {other}"
            ))),
        }
    }
}

/// What a request asks for, and therefore the shape of its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RequestId {
    /// Reply: one hand sign, `"stone" | "scissors" | "cloth"`.
    HandSign = 1,
    /// Reply: list of claimed slot numbers.
    OrderClaim = 2,
    /// Reply: `{"action": ..., "target"?: ..., "place"?: ...}`.
    Action = 3,
    /// Reply: list of upgrade selections.
    Upgrade = 4,
}

impl TryFrom<u16> for RequestId {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::HandSign),
            2 => Ok(Self::OrderClaim),
            3 => Ok(Self::Action),
            4 => Ok(Self::Upgrade),
            other => Err(ProtocolError::MalformedEnvelope(format!(
                "unknown request id {other}"
            ))),
        }
    }
}

/// Who sends a notify and who receives it.
///
/// The hundreds digit of the id picks the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `1xx`: produced by the server.
    FromServer,
    /// `2xx`: produced by another seat's session, relayed by the server.
    FromSession,
    /// `3xx`: addressed to the server itself.
    ToServer,
    /// `4xx`: addressed to the other sessions of the room.
    ToSession,
}

impl Namespace {
    /// Namespaces a client is allowed to send.
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::ToServer | Self::ToSession)
    }
}

/// Notify identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NotifyId {
    ServerVersion = 101,
    SignedIn = 102,
    PlayerAdded = 103,
    PlayerRemoved = 104,
    RoundStarted = 105,
    HandSigns = 106,
    OrderConfirmed = 107,
    Acted = 108,
    RoundOver = 109,
    Upgraded = 110,
    GameOver = 111,
    Error = 112,

    SessionStateChanged = 201,
    Chat = 202,

    ClientVersion = 301,
    SignIn = 302,
    Reconnect = 303,
    SetSessionState = 304,

    SendChat = 401,
}

impl NotifyId {
    const ALL: [NotifyId; 19] = [
        Self::ServerVersion,
        Self::SignedIn,
        Self::PlayerAdded,
        Self::PlayerRemoved,
        Self::RoundStarted,
        Self::HandSigns,
        Self::OrderConfirmed,
        Self::Acted,
        Self::RoundOver,
        Self::Upgraded,
        Self::GameOver,
        Self::Error,
        Self::SessionStateChanged,
        Self::Chat,
        Self::ClientVersion,
        Self::SignIn,
        Self::Reconnect,
        Self::SetSessionState,
        Self::SendChat,
    ];

    pub fn namespace(self) -> Namespace {
        match self as u16 / 100 {
            1 => Namespace::FromServer,
            2 => Namespace::FromSession,
            3 => Namespace::ToServer,
            _ => Namespace::ToSession,
        }
    }
}

impl TryFrom<u16> for NotifyId {
    type Error = ProtocolError;

    // `Self::Error` would be ambiguous with the `Error` notify.
    fn try_from(value: u16) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u16 == value)
            .ok_or_else(|| ProtocolError::MalformedEnvelope(format!("unknown notify id {value}")))
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// The only unit exchanged between agents and the server.
///
/// In memory the kind and its one meaningful id travel together, so a
/// request can never carry a notify id. On the wire it is the flat
/// envelope `{"type", "requestId", "notifyId", "value"}` with the unused
/// id set to `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPacket", into = "RawPacket")]
pub enum Packet {
    Request { id: RequestId, value: Value },
    Reply { id: RequestId, value: Value },
    Notify { id: NotifyId, value: Value },
}

impl Packet {
    /// Builds a notify, serializing `payload` into its value.
    pub fn notify<T: Serialize>(id: NotifyId, payload: &T) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self::Notify { id, value })
    }

    /// Builds a notify around an already-built value.
    pub fn notify_value(id: NotifyId, value: Value) -> Self {
        Self::Notify { id, value }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Request { .. } => PacketKind::Request,
            Self::Reply { .. } => PacketKind::Reply,
            Self::Notify { .. } => PacketKind::Notify,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Self::Request { value, .. } | Self::Reply { value, .. } | Self::Notify { value, .. } => {
                value
            }
        }
    }

    /// Parses the value as the payload type `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.value().clone()).map_err(|source| {
            ProtocolError::InvalidPayload {
                id: self.id_label(),
                source,
            }
        })
    }

    fn id_label(&self) -> String {
        match self {
            Self::Request { id, .. } | Self::Reply { id, .. } => format!("{id:?}"),
            Self::Notify { id, .. } => format!("{id:?}"),
        }
    }
}

/// The flat envelope exactly as it appears on the wire.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPacket {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    request_id: u16,
    #[serde(default)]
    notify_id: u16,
    #[serde(default)]
    value: Value,
}

impl TryFrom<RawPacket> for Packet {
    type Error = ProtocolError;

    fn try_from(raw: RawPacket) -> Result<Self, Self::Error> {
        let kind = PacketKind::try_from(raw.kind)?;
        let value = raw.value;
        match kind {
            PacketKind::Request | PacketKind::Reply => {
                if raw.notify_id != 0 {
                    return Err(ProtocolError::MalformedEnvelope(format!(
                        "{kind:?} carries notifyId {}",
                        raw.notify_id
                    )));
                }
                let id = RequestId::try_from(raw.request_id)?;
                Ok(match kind {
                    PacketKind::Request => Self::Request { id, value },
                    _ => Self::Reply { id, value },
                })
            }
            PacketKind::Notify => {
                if raw.request_id != 0 {
                    return Err(ProtocolError::MalformedEnvelope(format!(
                        "Notify carries requestId {}",
                        raw.request_id
                    )));
                }
                let id = NotifyId::try_from(raw.notify_id)?;
                Ok(Self::Notify { id, value })
            }
        }
    }
}

impl From<Packet> for RawPacket {
    fn from(packet: Packet) -> Self {
        let kind = packet.kind() as u8;
        match packet {
            Packet::Request { id, value } | Packet::Reply { id, value } => Self {
                kind,
                request_id: id as u16,
                notify_id: 0,
                value,
            },
            Packet::Notify { id, value } => Self {
                kind,
                request_id: 0,
                notify_id: id as u16,
                value,
            },
        }
    }
}
