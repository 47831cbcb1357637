//! What the state machine asks of players and what they answer.

use std::fmt;

use serde::{Deserialize, Serialize};
use skirmish_rules::{Action, HandSign, UpgradeKind};

/// Where the state machine is in the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Transient: players are reset and the first turn begins at once.
    BeforeRound,
    TieBreakForOrder,
    OrderClaim,
    TieBreakForOrderClaim,
    Acting,
    Upgrading,
    GameOver,
}

/// A question put to one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Show a hand sign.
    HandSign,
    /// Claim up to `tokens` of the `open_slots`.
    OrderClaim { open_slots: Vec<u32>, tokens: usize },
    /// Take this turn's action.
    Action,
    /// Spend exactly `points` upgrade points.
    Upgrade { points: u32 },
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::HandSign => RequestKind::HandSign,
            Self::OrderClaim { .. } => RequestKind::OrderClaim,
            Self::Action => RequestKind::Action,
            Self::Upgrade { .. } => RequestKind::Upgrade,
        }
    }
}

/// The four kinds of request, without their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    HandSign,
    OrderClaim,
    Action,
    Upgrade,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HandSign => "hand sign",
            Self::OrderClaim => "order claim",
            Self::Action => "action",
            Self::Upgrade => "upgrade",
        };
        f.write_str(name)
    }
}

/// One player's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    HandSign(HandSign),
    /// Claimed slot numbers.
    OrderClaim(Vec<u32>),
    Action(Action),
    Upgrade(Vec<UpgradeKind>),
}

impl Reply {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::HandSign(_) => RequestKind::HandSign,
            Self::OrderClaim(_) => RequestKind::OrderClaim,
            Self::Action(_) => RequestKind::Action,
            Self::Upgrade(_) => RequestKind::Upgrade,
        }
    }
}
