//! Rules engine for the skirmish game.
//!
//! Everything in this crate is pure, synchronous game logic: no I/O, no
//! async, no knowledge of who is connected. Higher layers ask it two kinds
//! of questions:
//!
//! - **Is this legal?** — the `check_*` methods on [`Player`] and
//!   [`Room::check`].
//! - **Do it.** — [`Room::apply`] and [`Room::apply_upgrades`], which run
//!   the same checks first and only mutate state if they pass.
//!
//! # Key types
//!
//! - [`Place`] — the hub (`Country`) and one city per seat
//! - [`HandSign`] — stone/scissors/cloth, plus [`resolve_hands`]
//! - [`Action`] / [`UpgradeKind`] — what a player can do
//! - [`Player`] — one participant's combat stats
//! - [`Room`] — the seated players of one game
//! - [`RuleConfig`] — damage values, ceilings, feature toggles

mod action;
mod config;
mod error;
mod place;
mod player;
mod room;
mod sign;

pub use action::{Action, ActionKind, ActionOutcome, ActionReply, Hit, Relocation, UpgradeKind};
pub use config::{PunishRounding, RuleConfig};
pub use error::RuleError;
pub use place::{Place, MAX_SEATS};
pub use player::Player;
pub use room::Room;
pub use sign::{resolve_hands, HandOutcome, HandSign};
