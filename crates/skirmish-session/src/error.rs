//! Error types for the session layer.

/// Errors raised by the [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session carries this connection identifier.
    #[error("no session for connection identifier {0}")]
    NotFound(String),

    /// The identifier exists but was issued to another player.
    #[error("connection identifier does not belong to {0}")]
    InvalidToken(String),

    /// The seat already has a live session.
    #[error("player {0} already has an active session")]
    AlreadyConnected(String),
}
