//! Room configuration and lifecycle state machine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_rules::{RuleConfig, RuleError};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
///
/// The seat count is `rules.player_count`; a room starts its game the
/// moment the last seat is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub rules: RuleConfig,

    /// How long a seat has to answer one request before the default
    /// reply is used.
    pub request_timeout: Duration,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl RoomConfig {
    pub fn capacity(&self) -> usize {
        self.rules.player_count
    }

    /// Checks the rules and the room settings together.
    pub fn validate(&self) -> Result<(), RuleError> {
        self.rules.validate()?;
        if self.channel_size == 0 {
            return Err(RuleError::InvalidConfig("channel_size must be positive".into()));
        }
        Ok(())
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            rules: RuleConfig::default(),
            request_timeout: Duration::from_secs(30),
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// States only move forward:
///
/// ```text
/// WaitingForPlayers → Starting → InProgress → Finished
///         └───────────────┴───────────┴──────→ Destroying
/// ```
///
/// A game that cannot be set up goes straight from `Starting` to
/// `Finished`.
///
/// - **WaitingForPlayers**: seats are open; a disconnect gives the seat up.
/// - **Starting**: the last seat was just filled and round 1 is being set
///   up.
/// - **InProgress**: rounds are running; a disconnect only marks the seat
///   offline.
/// - **Finished**: game over was broadcast, every seat went offline, or
///   the game could not go on.
/// - **Destroying**: shut down from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    WaitingForPlayers,
    Starting,
    InProgress,
    Finished,
    Destroying,
}

impl RoomState {
    /// Only a waiting room takes sign-ins.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }

    /// The actor has stopped or is about to.
    pub fn is_over(&self) -> bool {
        matches!(self, Self::Finished | Self::Destroying)
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::WaitingForPlayers, Self::Starting)
            | (Self::Starting, Self::InProgress)
            | (Self::Starting | Self::InProgress, Self::Finished) => true,
            (from, Self::Destroying) => !from.is_over(),
            _ => false,
        }
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForPlayers => "waiting for players",
            Self::Starting => "starting",
            Self::InProgress => "in progress",
            Self::Finished => "finished",
            Self::Destroying => "destroying",
        };
        f.write_str(name)
    }
}
