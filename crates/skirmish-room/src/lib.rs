//! Room orchestration for the skirmish server.
//!
//! Each room runs as an isolated Tokio task (actor model) owning one
//! [`Logic`](skirmish_logic::Logic) and the [`Agent`](skirmish_session::Agent)
//! of every seat. The actor turns state-machine requests into request
//! packets, reply packets back into state-machine input, and publishes
//! its lifecycle state so the manager can pick a waiting room without
//! messaging busy ones.
//!
//! # Key types
//!
//! - [`RoomManager`] — creates rooms and seats newcomers in them
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomState`] — lifecycle state machine
//! - [`RoomConfig`] — rules, request timeout, channel size

mod config;
mod error;
mod manager;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{Departure, JoinRequest, RoomHandle, RoomInfo, Seat};
