//! The session manager: connection identifiers for every seat.
//!
//! A seat is identified by its room and player name. At sign-in the seat
//! is recorded under a random connection identifier (see
//! [`new_connection_id`]); a client that loses its connection presents
//! name + identifier to take the seat back.
//!
//! ```text
//! create() ──→ [Connected] ──disconnect()──→ [Disconnected]
//!                   ▲                              │
//!                   └────────── reconnect() ───────┘
//!
//! remove() / remove_room() drop the record for good.
//! ```
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` wrapper. The server keeps it
//! behind a mutex; every operation here is short and never awaits.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;
use skirmish_protocol::RoomId;

use crate::{Session, SessionError, SessionState};

/// Registry of every seat's connection record.
#[derive(Debug, Default)]
pub struct SessionManager {
    /// Keyed by connection identifier.
    sessions: HashMap<String, Session>,
    /// `(room, player)` → connection identifier. Kept in sync with
    /// `sessions`.
    seats: HashMap<(RoomId, String), String>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly seated player under `connection_id`.
    ///
    /// A disconnected record for the same seat is replaced.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the seat has a live session.
    pub fn create(
        &mut self,
        room_id: RoomId,
        player: &str,
        connection_id: String,
        link: u64,
    ) -> Result<&Session, SessionError> {
        let key = (room_id, player.to_string());
        if let Some(old_id) = self.seats.get(&key) {
            if self.sessions.get(old_id).is_some_and(Session::is_connected) {
                return Err(SessionError::AlreadyConnected(player.to_string()));
            }
            let old_id = old_id.clone();
            self.sessions.remove(&old_id);
        }

        self.seats.insert(key, connection_id.clone());
        self.sessions.insert(
            connection_id.clone(),
            Session {
                connection_id: connection_id.clone(),
                player: player.to_string(),
                room_id,
                state: SessionState::Connected,
                link,
            },
        );
        tracing::info!(%room_id, player, "session created");

        Ok(self.sessions.get(&connection_id).expect("just inserted"))
    }

    /// Marks the seat disconnected, if `link` is still the bound
    /// connection.
    ///
    /// Returns `false` for a stale notice from a connection that has
    /// already been replaced by a reconnect.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the identifier is unknown.
    pub fn disconnect(&mut self, connection_id: &str, link: u64) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(connection_id)
            .ok_or_else(|| SessionError::NotFound(connection_id.to_string()))?;
        if session.link != link {
            return Ok(false);
        }
        session.state = SessionState::Disconnected { since: Instant::now() };
        tracing::info!(room_id = %session.room_id, player = %session.player, "session disconnected");
        Ok(true)
    }

    /// Re-binds the seat named `player` to a new connection.
    ///
    /// A seat that still looks connected is taken over: the old
    /// connection may not have noticed its own drop yet.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the identifier is unknown
    /// - [`SessionError::InvalidToken`] if it belongs to someone else
    pub fn reconnect(&mut self, player: &str, connection_id: &str, link: u64) -> Result<&Session, SessionError> {
        let session = self
            .sessions
            .get_mut(connection_id)
            .ok_or_else(|| SessionError::NotFound(connection_id.to_string()))?;
        if session.player != player {
            return Err(SessionError::InvalidToken(player.to_string()));
        }
        if session.is_connected() {
            tracing::info!(room_id = %session.room_id, player, "live session taken over");
        }
        session.state = SessionState::Connected;
        session.link = link;
        tracing::info!(room_id = %session.room_id, player, "session reconnected");
        Ok(session)
    }

    /// Drops one record, e.g. when the seat is released before the game
    /// starts.
    pub fn remove(&mut self, connection_id: &str) -> Option<Session> {
        let session = self.sessions.remove(connection_id)?;
        self.seats.remove(&(session.room_id, session.player.clone()));
        Some(session)
    }

    /// Drops every record of `room_id`. Returns how many were dropped.
    pub fn remove_room(&mut self, room_id: RoomId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.room_id != room_id);
        self.seats.retain(|(room, _), _| *room != room_id);
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::info!(%room_id, removed, "room sessions dropped");
        }
        removed
    }

    pub fn get(&self, connection_id: &str) -> Option<&Session> {
        self.sessions.get(connection_id)
    }

    /// Looks a seat up by room and player name.
    pub fn find(&self, room_id: RoomId, player: &str) -> Option<&Session> {
        let id = self.seats.get(&(room_id, player.to_string()))?;
        self.sessions.get(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// A fresh connection identifier: 32 lowercase hex chars (128 random
/// bits). Generated before the seat is taken so the room can hand it out
/// in its welcome.
pub fn new_connection_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: RoomId = RoomId(1);

    fn manager_with(players: &[&str]) -> (SessionManager, Vec<String>) {
        let mut mgr = SessionManager::new();
        let ids = players
            .iter()
            .enumerate()
            .map(|(i, p)| mgr.create(ROOM, p, new_connection_id(), i as u64).unwrap().connection_id.clone())
            .collect();
        (mgr, ids)
    }

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_new_seat_returns_connected_session() {
        let mut mgr = SessionManager::new();
        let session = mgr.create(ROOM, "alice", new_connection_id(), 1).unwrap();

        assert!(session.is_connected());
        assert_eq!(session.player, "alice");
        assert_eq!(session.room_id, ROOM);
        assert_eq!(session.connection_id.len(), 32);
        assert!(session.connection_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_create_each_seat_gets_unique_identifier() {
        let (_, ids) = manager_with(&["alice", "bob"]);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_create_same_name_other_room_is_allowed() {
        let mut mgr = SessionManager::new();
        mgr.create(RoomId(1), "alice", new_connection_id(), 1).unwrap();
        assert!(mgr.create(RoomId(2), "alice", new_connection_id(), 2).is_ok());
        assert_eq!(mgr.len(), 2);
    }

    #[test]
    fn test_create_connected_seat_returns_already_connected() {
        let (mut mgr, _) = manager_with(&["alice"]);
        let result = mgr.create(ROOM, "alice", new_connection_id(), 9);
        assert_eq!(result.unwrap_err(), SessionError::AlreadyConnected("alice".into()));
    }

    #[test]
    fn test_create_replaces_disconnected_seat() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        mgr.disconnect(&ids[0], 0).unwrap();

        let fresh = mgr.create(ROOM, "alice", new_connection_id(), 5).unwrap().connection_id.clone();
        assert_ne!(fresh, ids[0]);
        assert!(mgr.get(&ids[0]).is_none());
        assert_eq!(mgr.len(), 1);
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_bound_link_marks_disconnected() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        assert!(mgr.disconnect(&ids[0], 0).unwrap());
        assert!(matches!(mgr.get(&ids[0]).unwrap().state, SessionState::Disconnected { .. }));
    }

    #[test]
    fn test_disconnect_stale_link_is_ignored() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        mgr.reconnect("alice", &ids[0], 42).unwrap();

        assert!(!mgr.disconnect(&ids[0], 0).unwrap());
        assert!(mgr.get(&ids[0]).unwrap().is_connected());
    }

    #[test]
    fn test_disconnect_unknown_identifier_returns_not_found() {
        let mut mgr = SessionManager::new();
        assert!(matches!(mgr.disconnect("nope", 0), Err(SessionError::NotFound(_))));
    }

    // =====================================================================
    // reconnect()
    // =====================================================================

    #[test]
    fn test_reconnect_valid_identifier_restores_connected() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        mgr.disconnect(&ids[0], 0).unwrap();

        let session = mgr.reconnect("alice", &ids[0], 3).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.link, 3);
    }

    #[test]
    fn test_reconnect_wrong_player_returns_invalid_token() {
        let (mut mgr, ids) = manager_with(&["alice", "bob"]);
        let result = mgr.reconnect("bob", &ids[0], 3);
        assert_eq!(result.unwrap_err(), SessionError::InvalidToken("bob".into()));
    }

    #[test]
    fn test_reconnect_unknown_identifier_returns_not_found() {
        let (mut mgr, _) = manager_with(&["alice"]);
        assert!(matches!(mgr.reconnect("alice", "0000", 3), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_reconnect_live_session_takes_over() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        let session = mgr.reconnect("alice", &ids[0], 99).unwrap();
        assert_eq!(session.link, 99);
    }

    // =====================================================================
    // remove() / remove_room() / find()
    // =====================================================================

    #[test]
    fn test_remove_drops_record_and_seat_index() {
        let (mut mgr, ids) = manager_with(&["alice"]);
        assert!(mgr.remove(&ids[0]).is_some());
        assert!(mgr.find(ROOM, "alice").is_none());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_remove_room_drops_only_that_room() {
        let mut mgr = SessionManager::new();
        mgr.create(RoomId(1), "alice", new_connection_id(), 1).unwrap();
        mgr.create(RoomId(1), "bob", new_connection_id(), 2).unwrap();
        mgr.create(RoomId(2), "carol", new_connection_id(), 3).unwrap();

        assert_eq!(mgr.remove_room(RoomId(1)), 2);
        assert_eq!(mgr.len(), 1);
        assert!(mgr.find(RoomId(2), "carol").is_some());
        assert!(mgr.find(RoomId(1), "alice").is_none());
    }

    #[test]
    fn test_find_returns_seat_record() {
        let (mgr, ids) = manager_with(&["alice", "bob"]);
        assert_eq!(mgr.find(ROOM, "bob").unwrap().connection_id, ids[1]);
    }
}
