//! Seat and connection bookkeeping for the skirmish server.
//!
//! Two pieces live here:
//!
//! 1. **Agents** ([`Agent`]) — the server-side stand-in for one seat. An
//!    agent owns the seat's outstanding request and deadline, and knows
//!    whether a connection is bound and whether that connection answers
//!    for itself. When it cannot get a real answer it produces a
//!    [`default_reply`] instead, so a room never waits on a dead seat.
//! 2. **Sessions** ([`SessionManager`]) — the connection identifiers
//!    handed out at sign-in, used to re-bind a new connection to an
//!    existing seat after a drop.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← drives agents, asks the manager about seats
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below) ← Packet, RequestId, request/reply encoding
//! ```

mod agent;
mod defaults;
mod error;
mod manager;
mod session;

pub use agent::{Agent, AgentStatus, PacketSender};
pub use defaults::default_reply;
pub use error::SessionError;
pub use manager::{SessionManager, new_connection_id};
pub use session::{Session, SessionState};
