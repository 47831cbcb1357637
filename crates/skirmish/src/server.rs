//! `SkirmishServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_protocol::{Codec, JsonCodec};
use skirmish_room::{RoomConfig, RoomManager};
use skirmish_rules::RuleConfig;
use skirmish_session::SessionManager;
use skirmish_transport::{LineTransport, Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::SkirmishError;
use crate::handler::handle_connection;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Everything the server needs to run. Loading it is up to the embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub room: RoomConfig,
    /// How long a new connection has to send its `ClientVersion`.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room: RoomConfig::default(),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// The two managers sit behind their own mutex. The rooms lock is held
/// for the whole of a seat assignment, which keeps matchmaking serial;
/// only rooms still waiting for players are asked during it.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) handshake_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a skirmish server.
///
/// # Example
///
/// ```rust,no_run
/// use skirmish::SkirmishServer;
///
/// # async fn run() -> Result<(), skirmish::SkirmishError> {
/// let server = SkirmishServer::builder()
///     .bind("0.0.0.0:8080")
///     .request_timeout(std::time::Duration::from_secs(20))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkirmishServerBuilder {
    config: ServerConfig,
}

impl SkirmishServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    pub fn rules(mut self, rules: RuleConfig) -> Self {
        self.config.room.rules = rules;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.room.request_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Binds a WebSocket listener: one binary message per packet.
    pub async fn build(self) -> Result<SkirmishServer<WebSocketTransport>, SkirmishError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        self.finish(transport)
    }

    /// Binds a plain TCP listener: one JSON packet per line.
    pub async fn build_tcp(self) -> Result<SkirmishServer<LineTransport>, SkirmishError> {
        let transport = LineTransport::bind(&self.config.bind_addr).await?;
        self.finish(transport)
    }

    fn finish<T: Transport>(self, transport: T) -> Result<SkirmishServer<T>, SkirmishError> {
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            rooms: Mutex::new(RoomManager::new(self.config.room)?),
            codec: JsonCodec,
            handshake_timeout: self.config.handshake_timeout,
        });
        Ok(SkirmishServer { transport, state })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound skirmish server. Call [`run()`](Self::run) to start accepting
/// connections.
pub struct SkirmishServer<T: Transport, C: Codec = JsonCodec> {
    transport: T,
    state: Arc<ServerState<C>>,
}

impl SkirmishServer<WebSocketTransport> {
    pub fn builder() -> SkirmishServerBuilder {
        SkirmishServerBuilder::new()
    }
}

impl<T: Transport, C: Codec> SkirmishServer<T, C> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop forever.
    pub async fn run(self) -> Result<(), SkirmishError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then destroys every
    /// room, which closes every seated connection.
    ///
    /// Every accepted connection gets its own task; a failed accept is
    /// logged and the loop goes on.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), SkirmishError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "skirmish server running");
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutdown requested, no longer accepting");
        self.state.rooms.lock().await.shutdown_all().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters_update_config() {
        let builder = SkirmishServerBuilder::new()
            .bind("0.0.0.0:9000")
            .request_timeout(Duration::from_secs(3))
            .handshake_timeout(Duration::from_secs(1));
        assert_eq!(builder.config.bind_addr, "0.0.0.0:9000");
        assert_eq!(builder.config.room.request_timeout, Duration::from_secs(3));
        assert_eq!(builder.config.handshake_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_server_config_from_partial_json_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"bind_addr": "0.0.0.0:1", "room": {"rules": {"player_count": 3}}}"#)
                .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:1");
        assert_eq!(config.room.capacity(), 3);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_build_with_invalid_rules_fails() {
        let result = SkirmishServerBuilder::new()
            .bind("127.0.0.1:0")
            .rules(RuleConfig {
                player_count: 1,
                ..RuleConfig::default()
            })
            .build_tcp()
            .await;
        assert!(matches!(result, Err(SkirmishError::Room(_))));
    }
}
