//! Skirmish game server.
//!
//! Environment:
//! - `SKIRMISH_ADDR`: listen address (default `0.0.0.0:8080`)
//! - `SKIRMISH_TRANSPORT`: `ws` (default) or `tcp` for newline-delimited JSON
//! - `SKIRMISH_PLAYERS`: seats per room (default 4)
//! - `SKIRMISH_REQUEST_TIMEOUT`: seconds a seat has to answer (default 30)
//! - `RUST_LOG`: tracing filter (default `info`)

use std::time::Duration;

use skirmish::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), SkirmishError> {
    skirmish::init_tracing();

    let mut config = ServerConfig {
        bind_addr: std::env::var("SKIRMISH_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
        ..ServerConfig::default()
    };
    if let Some(players) = env_number("SKIRMISH_PLAYERS") {
        config.room.rules.player_count = players as usize;
    }
    if let Some(secs) = env_number("SKIRMISH_REQUEST_TIMEOUT") {
        config.room.request_timeout = Duration::from_secs(secs);
    }

    let builder = SkirmishServer::builder().config(config);
    match std::env::var("SKIRMISH_TRANSPORT").as_deref() {
        Ok("tcp") => {
            info!("starting skirmish server over tcp");
            builder.build_tcp().await?.run_until(shutdown_signal()).await
        }
        _ => {
            info!("starting skirmish server over websocket");
            builder.build().await?.run_until(shutdown_signal()).await
        }
    }
}

/// Resolves on Ctrl-C. If the signal cannot be watched the server simply
/// runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
