//! Turn-resolution state machine for one skirmish game.
//!
//! [`Logic`] owns a [`Room`](skirmish_rules::Room) and walks it through
//! rounds:
//!
//! ```text
//! BeforeRound → TieBreakForOrder → OrderClaim ⇄ TieBreakForOrderClaim
//!             → Acting → (TieBreakForOrder | Upgrading)
//!             → (BeforeRound | GameOver)
//! ```
//!
//! It never waits on anything. The driver pulls from it instead:
//!
//! 1. [`Logic::start`] returns the first [`Transition`]: broadcasts to
//!    show and [`Request`]s to hand out.
//! 2. Answers come back through [`Logic::submit`] (validated) or
//!    [`Logic::fallback`] (last resort, always accepted).
//! 3. Once [`Logic::is_ready`], [`Logic::advance`] resolves the phase and
//!    returns the next transition.
//!
//! Observers registered with [`Logic::observe`] see every broadcast as it
//! is produced.

mod error;
mod event;
mod logic;
mod request;

pub use error::LogicError;
pub use event::{
    Acted, Broadcast, GameOver, HandSigns, OrderConfirmed, RoundOver, RoundStarted, ShownSign,
    Transition, Upgraded,
};
pub use logic::Logic;
pub use request::{Phase, Reply, Request, RequestKind};
