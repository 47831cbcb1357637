//! How the state machine's requests, replies, and broadcasts are encoded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skirmish_logic::{Broadcast, Reply, Request, RequestKind};
use skirmish_rules::{Action, HandSign, UpgradeKind};

use crate::{NotifyId, Packet, ProtocolError, RequestId};

/// Value of an `OrderClaim` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClaimRequest {
    pub open_slots: Vec<u32>,
    /// How many of the open slots may be claimed.
    pub tokens: usize,
}

/// Value of an `Upgrade` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Exactly this many selections are expected.
    pub points: u32,
}

impl From<RequestKind> for RequestId {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::HandSign => Self::HandSign,
            RequestKind::OrderClaim => Self::OrderClaim,
            RequestKind::Action => Self::Action,
            RequestKind::Upgrade => Self::Upgrade,
        }
    }
}

impl From<RequestId> for RequestKind {
    fn from(id: RequestId) -> Self {
        match id {
            RequestId::HandSign => Self::HandSign,
            RequestId::OrderClaim => Self::OrderClaim,
            RequestId::Action => Self::Action,
            RequestId::Upgrade => Self::Upgrade,
        }
    }
}

/// Encodes a request for the wire.
pub fn request_packet(request: &Request) -> Result<Packet, ProtocolError> {
    let value = match request {
        Request::HandSign | Request::Action => Value::Null,
        Request::OrderClaim { open_slots, tokens } => to_value(&OrderClaimRequest {
            open_slots: open_slots.clone(),
            tokens: *tokens,
        })?,
        Request::Upgrade { points } => to_value(&UpgradeRequest { points: *points })?,
    };
    Ok(Packet::Request {
        id: request.kind().into(),
        value,
    })
}

/// Decodes the value of a reply to request `id`.
///
/// Fails with [`ProtocolError::InvalidPayload`] when the value does not
/// have the shape fixed for `id`; whether the content is legal is for
/// the state machine to decide.
pub fn decode_reply(id: RequestId, value: Value) -> Result<Reply, ProtocolError> {
    let invalid = |source| ProtocolError::InvalidPayload {
        id: format!("{id:?}"),
        source,
    };
    let reply = match id {
        RequestId::HandSign => Reply::HandSign(serde_json::from_value::<HandSign>(value).map_err(invalid)?),
        RequestId::OrderClaim => {
            Reply::OrderClaim(serde_json::from_value::<Vec<u32>>(value).map_err(invalid)?)
        }
        RequestId::Action => Reply::Action(serde_json::from_value::<Action>(value).map_err(invalid)?),
        RequestId::Upgrade => {
            Reply::Upgrade(serde_json::from_value::<Vec<UpgradeKind>>(value).map_err(invalid)?)
        }
    };
    Ok(reply)
}

/// Encodes a broadcast as its from-server notify.
pub fn broadcast_packet(broadcast: &Broadcast) -> Result<Packet, ProtocolError> {
    match broadcast {
        Broadcast::RoundStarted(payload) => Packet::notify(NotifyId::RoundStarted, payload),
        Broadcast::HandSigns(payload) => Packet::notify(NotifyId::HandSigns, payload),
        Broadcast::OrderConfirmed(payload) => Packet::notify(NotifyId::OrderConfirmed, payload),
        Broadcast::Acted(payload) => Packet::notify(NotifyId::Acted, payload),
        Broadcast::RoundOver(payload) => Packet::notify(NotifyId::RoundOver, payload),
        Broadcast::Upgraded(payload) => Packet::notify(NotifyId::Upgraded, payload),
        Broadcast::GameOver(payload) => Packet::notify(NotifyId::GameOver, payload),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(ProtocolError::Encode)
}
