//! Broadcasts produced by the state machine and the transitions that
//! carry them.

use serde::{Deserialize, Serialize};
use skirmish_rules::{Action, ActionOutcome, HandSign, Player, UpgradeKind};

use crate::Request;

/// Something every seat should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast {
    RoundStarted(RoundStarted),
    HandSigns(HandSigns),
    OrderConfirmed(OrderConfirmed),
    Acted(Acted),
    RoundOver(RoundOver),
    Upgraded(Upgraded),
    GameOver(GameOver),
}

/// A new round began; every player has been reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStarted {
    pub round: u32,
    pub players: Vec<Player>,
}

/// One player's shown sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShownSign {
    pub player: String,
    pub sign: HandSign,
}

/// The signs of a tie-break and who won it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandSigns {
    /// The contested slot, or `None` for the tie-break over the whole
    /// order.
    pub slot: Option<u32>,
    pub signs: Vec<ShownSign>,
    /// Empty when the tie-break did not resolve.
    pub winners: Vec<String>,
    /// Claim tokens each winner received (0 for slot tie-breaks).
    pub tokens: usize,
}

/// Final action order for the turn. `order[0]` owns slot 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub order: Vec<String>,
}

/// A player took their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acted {
    pub slot: u32,
    pub player: String,
    /// What was actually applied: a refused action shows up as `Pass`.
    pub action: Action,
    pub outcome: ActionOutcome,
}

/// Only one player (or none) is left standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOver {
    pub round: u32,
    pub survivors: Vec<String>,
}

/// A player spent their upgrade points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgraded {
    pub player: String,
    pub upgrades: Vec<UpgradeKind>,
}

/// The match is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    pub winners: Vec<String>,
}

/// The result of starting or advancing the state machine.
#[derive(Debug, Default)]
pub struct Transition {
    /// Broadcasts, in the order they happened.
    pub broadcasts: Vec<Broadcast>,
    /// New requests to hand out, one per player.
    pub requests: Vec<(String, Request)>,
}

impl Transition {
    pub(crate) fn broadcast(&mut self, broadcast: Broadcast) {
        self.broadcasts.push(broadcast);
    }

    /// Returns `true` when the game ended in this transition.
    pub fn is_game_over(&self) -> bool {
        self.broadcasts
            .iter()
            .any(|b| matches!(b, Broadcast::GameOver(_)))
    }
}
