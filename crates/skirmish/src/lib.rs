//! # Skirmish
//!
//! Server for a turn-based, server-authoritative combat game: every room
//! seats a fixed number of players who each round play stone-scissors-cloth
//! for turn order, act in that order, and spend upgrade points when the
//! round is over.
//!
//! The server owns all game state. Clients only ever answer the requests
//! they are sent; whoever is slow, silent, or gone gets a default answer
//! and the room keeps going.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skirmish::prelude::*;
//!
//! # async fn run() -> Result<(), SkirmishError> {
//! skirmish::init_tracing();
//! let server = SkirmishServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::SkirmishError;
pub use server::{ServerConfig, SkirmishServer, SkirmishServerBuilder};

/// Everything needed to embed and configure a server.
pub mod prelude {
    pub use crate::{ServerConfig, SkirmishError, SkirmishServer, SkirmishServerBuilder};
    pub use skirmish_protocol::{PROTOCOL_VERSION, Packet, RoomId};
    pub use skirmish_room::RoomConfig;
    pub use skirmish_rules::{PunishRounding, RuleConfig};
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
