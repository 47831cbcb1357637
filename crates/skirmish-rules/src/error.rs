//! Error types for the rules engine.
//!
//! Every failed legality check maps to exactly one variant, so callers
//! (and logs) can tell *why* an action was refused.

use crate::{Place, UpgradeKind};

/// Errors produced by rule checks and roster operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// No player with this name is seated.
    #[error("unknown player {0:?}")]
    UnknownPlayer(String),

    /// A player with this name is already seated.
    #[error("player name {0:?} is already taken")]
    DuplicateName(String),

    /// Every seat is occupied.
    #[error("room is full ({0} seats)")]
    RoomFull(usize),

    /// Membership is frozen once the game has started.
    #[error("the game has already started")]
    GameStarted,

    /// The acting player is dead.
    #[error("{0} is dead")]
    ActorDead(String),

    /// The targeted player is dead.
    #[error("target {0} is dead")]
    TargetDead(String),

    /// Players cannot target themselves.
    #[error("{0} cannot target themselves")]
    SelfTarget(String),

    /// The item is already owned.
    #[error("{player} already owns a {item}")]
    AlreadyOwned { player: String, item: &'static str },

    /// The item is required but not owned.
    #[error("{player} does not own a {item}")]
    MissingEquipment { player: String, item: &'static str },

    /// Purchases are restricted to the buyer's home city.
    #[error("{player} must be in {home} to buy")]
    NotHome { player: String, home: Place },

    /// The two players are not where the action needs them to be.
    #[error("{actor} cannot reach {target}")]
    OutOfReach { actor: String, target: String },

    /// Mount attacks are not possible in the hub.
    #[error("mount attacks are not allowed in the Country")]
    MountInHub,

    /// The destination is not adjacent to the starting place.
    #[error("{to} is not adjacent to {from}")]
    NotAdjacent { from: Place, to: Place },

    /// The place does not exist in this room (city of an unused seat).
    #[error("{0} does not exist in this room")]
    NoSuchPlace(Place),

    /// The place number is outside the fixed enumeration.
    #[error("invalid place number {0}")]
    InvalidPlace(u8),

    /// Force-moving is administratively disabled.
    #[error("force-move is disabled")]
    ForceMoveDisabled,

    /// The stat is already at its configured ceiling.
    #[error("{player} has reached the {kind} ceiling")]
    AtCeiling { player: String, kind: UpgradeKind },

    /// An upgrade batch did not spend exactly the points held.
    #[error("{player} holds {held} upgrade points but selected {selected}")]
    PointMismatch {
        player: String,
        held: u32,
        selected: usize,
    },

    /// An action reply is missing a field it needs, or carries one it
    /// must not.
    #[error("malformed action: {0}")]
    MalformedAction(String),

    /// The rule configuration is inconsistent.
    #[error("invalid rule config: {0}")]
    InvalidConfig(String),
}
