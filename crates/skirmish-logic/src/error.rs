//! Error types for the turn-resolution state machine.

use skirmish_rules::RuleError;

use crate::RequestKind;

/// Errors returned by [`Logic`](crate::Logic).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    /// No request is outstanding for this player.
    #[error("no request is outstanding for {0}")]
    NotAwaiting(String),

    /// The reply answers a different request than the one outstanding.
    #[error("{player} answered the wrong request (expected {expected})")]
    UnexpectedReply {
        player: String,
        expected: RequestKind,
    },

    /// An order claim names closed, duplicate, or too many slots.
    #[error("invalid order claim from {player}: {reason}")]
    InvalidClaim { player: String, reason: String },

    /// The reply fails a rules check.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// `advance` was called with replies still missing.
    #[error("{0} replies are still outstanding")]
    NotReady(usize),

    /// `start` was called twice.
    #[error("the game has already started")]
    AlreadyStarted,

    /// `start` needs at least two seated players.
    #[error("need at least 2 players to start, have {0}")]
    NotEnoughPlayers(usize),

    /// The game is over; nothing more can happen.
    #[error("the game is over")]
    Finished,
}
