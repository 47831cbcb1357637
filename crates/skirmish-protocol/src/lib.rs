//! Wire protocol for the skirmish server.
//!
//! This crate defines the "language" that agents and the server speak:
//!
//! - **Packets** ([`Packet`], [`RequestId`], [`NotifyId`]) — the one
//!   envelope that travels on the wire, in three kinds: request, reply,
//!   notify.
//! - **Payloads** ([`SignIn`], [`Chat`], ...) — the fixed `value` shape
//!   for each notify id.
//! - **Game mapping** ([`request_packet`], [`decode_reply`],
//!   [`broadcast_packet`]) — how state-machine requests, replies, and
//!   broadcasts look once encoded.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — packets to bytes and
//!   back.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → Session / Room (players)
//! ```
//!
//! # Wire format
//!
//! ```json
//! { "type": 1, "requestId": 2, "notifyId": 0, "value": { "open_slots": [1, 2], "tokens": 1 } }
//! ```

mod codec;
mod error;
mod game;
mod packet;
mod payload;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use game::{
    OrderClaimRequest, UpgradeRequest, broadcast_packet, decode_reply, request_packet,
};
pub use packet::{Namespace, NotifyId, Packet, PacketKind, RequestId, RoomId};
pub use payload::{
    Chat, ErrorCode, ErrorNotice, PlayerAdded, PlayerRemoved, Reconnect, SessionState,
    SetSessionState, SignIn, SignedIn, Version,
};

/// Version carried by the mandatory first `Version` notify.
pub const PROTOCOL_VERSION: u32 = 1;
