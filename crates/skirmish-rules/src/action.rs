//! Actions a player can take on their turn, upgrades bought between
//! rounds, and the report of what an action did.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Place, RuleError};

/// One turn's action.
///
/// Serialized flat, as an [`ActionReply`]: `{"action": "attack_melee",
/// "target": "bob"}`. Fields not used by the action must be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ActionReply", into = "ActionReply")]
pub enum Action {
    Pass,
    BuyWeapon,
    BuyMount,
    AttackMelee { target: String },
    AttackMount { target: String },
    Move { place: Place },
    ForceMove { target: String, place: Place },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Pass => ActionKind::Pass,
            Self::BuyWeapon => ActionKind::BuyWeapon,
            Self::BuyMount => ActionKind::BuyMount,
            Self::AttackMelee { .. } => ActionKind::AttackMelee,
            Self::AttackMount { .. } => ActionKind::AttackMount,
            Self::Move { .. } => ActionKind::Move,
            Self::ForceMove { .. } => ActionKind::ForceMove,
        }
    }

    /// The player this action targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::AttackMelee { target }
            | Self::AttackMount { target }
            | Self::ForceMove { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// The action enum as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Pass,
    BuyWeapon,
    BuyMount,
    AttackMelee,
    AttackMount,
    Move,
    ForceMove,
}

/// Wire shape of an action: the kind plus optional target and place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReply {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

impl TryFrom<ActionReply> for Action {
    type Error = RuleError;

    fn try_from(reply: ActionReply) -> Result<Self, Self::Error> {
        let kind = reply.action;
        let malformed = |what: &str| RuleError::MalformedAction(format!("{kind:?} {what}"));

        match (kind, reply.target, reply.place) {
            (ActionKind::Pass, None, None) => Ok(Self::Pass),
            (ActionKind::BuyWeapon, None, None) => Ok(Self::BuyWeapon),
            (ActionKind::BuyMount, None, None) => Ok(Self::BuyMount),
            (ActionKind::AttackMelee, Some(target), None) => Ok(Self::AttackMelee { target }),
            (ActionKind::AttackMount, Some(target), None) => Ok(Self::AttackMount { target }),
            (ActionKind::Move, None, Some(place)) => Ok(Self::Move { place }),
            (ActionKind::ForceMove, Some(target), Some(place)) => {
                Ok(Self::ForceMove { target, place })
            }
            (ActionKind::Pass | ActionKind::BuyWeapon | ActionKind::BuyMount, ..) => {
                Err(malformed("takes no target or place"))
            }
            (ActionKind::AttackMelee | ActionKind::AttackMount, ..) => {
                Err(malformed("needs a target and no place"))
            }
            (ActionKind::Move, ..) => Err(malformed("needs a place and no target")),
            (ActionKind::ForceMove, ..) => Err(malformed("needs a target and a place")),
        }
    }
}

impl From<Action> for ActionReply {
    fn from(action: Action) -> Self {
        let kind = action.kind();
        let (target, place) = match action {
            Action::Pass | Action::BuyWeapon | Action::BuyMount => (None, None),
            Action::AttackMelee { target } | Action::AttackMount { target } => (Some(target), None),
            Action::Move { place } => (None, Some(place)),
            Action::ForceMove { target, place } => (Some(target), Some(place)),
        };
        Self {
            action: kind,
            target,
            place,
        }
    }
}

/// A stat that can be raised between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Melee damage.
    Weapon,
    /// Mount damage.
    Mount,
    MaxHp,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [Self::Weapon, Self::Mount, Self::MaxHp];
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weapon => "weapon",
            Self::Mount => "mount",
            Self::MaxHp => "max hp",
        };
        f.write_str(name)
    }
}

/// One instance of damage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub victim: String,
    /// Who is credited with the damage (and the kill, if any).
    pub dealer: String,
    pub amount: i32,
    pub hp_after: i32,
    /// `true` if this hit took the victim from alive to dead.
    pub killed: bool,
}

/// A player moved from one place to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub player: String,
    pub from: Place,
    pub to: Place,
}

/// Everything an applied action changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub hits: Vec<Hit>,
    pub moves: Vec<Relocation>,
}
