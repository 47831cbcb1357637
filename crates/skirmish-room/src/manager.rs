//! Room manager: creates rooms and seats newcomers in them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use skirmish_protocol::RoomId;

use crate::room::spawn_room;
use crate::{JoinRequest, RoomConfig, RoomError, RoomHandle, Seat};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Tracks every live room.
///
/// Rooms are kept in creation order, so matchmaking fills the oldest
/// waiting room first.
#[derive(Debug)]
pub struct RoomManager {
    rooms: BTreeMap<RoomId, RoomHandle>,
    config: RoomConfig,
}

impl RoomManager {
    /// Creates an empty manager whose rooms all use `config`.
    ///
    /// # Errors
    /// [`RoomError::Rule`] if the configuration is inconsistent.
    pub fn new(config: RoomConfig) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            rooms: BTreeMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Spawns a new, empty room.
    pub fn create_room(&mut self) -> Result<RoomId, RoomError> {
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_room(room_id, self.config.clone())?;
        self.rooms.insert(room_id, handle);
        tracing::info!(%room_id, capacity = self.config.capacity(), "room created");
        Ok(room_id)
    }

    /// Seats a newcomer in the first waiting room that takes them, or in
    /// a fresh room.
    ///
    /// Only rooms that published a waiting state are asked, and a room
    /// whose command channel is full is skipped rather than waited on.
    /// Rooms where the name is taken or that filled up meanwhile are
    /// skipped too.
    pub async fn join_or_create(&mut self, request: JoinRequest) -> Result<Seat, RoomError> {
        for handle in self.rooms.values() {
            if !handle.is_joinable() {
                continue;
            }
            match handle.try_join(request.clone()).await {
                Ok(seat) => return Ok(seat),
                Err(
                    RoomError::NameTaken { .. }
                    | RoomError::RoomFull(_)
                    | RoomError::InvalidState { .. }
                    | RoomError::Unavailable(_),
                ) => continue,
                Err(e) => return Err(e),
            }
        }

        let room_id = self.create_room()?;
        let handle = self.rooms.get(&room_id).expect("just created this room");
        handle.join(request).await
    }

    /// Returns a handle to a room, if it is still tracked.
    pub fn get(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.rooms.get(&room_id).cloned()
    }

    /// Forgets rooms whose actor has exited and returns their ids, so the
    /// caller can release their connection identifiers.
    pub fn prune_finished(&mut self) -> Vec<RoomId> {
        let finished: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, handle)| handle.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for room_id in &finished {
            self.rooms.remove(room_id);
            tracing::info!(%room_id, "room pruned");
        }
        finished
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self.rooms.remove(&room_id).ok_or(RoomError::NotFound(room_id))?;
        match handle.get_info().await {
            Ok(info) => tracing::info!(
                %room_id,
                state = %info.state,
                round = info.round,
                players = info.player_count,
                online = info.online,
                "destroying room"
            ),
            Err(_) => tracing::debug!(%room_id, "room already stopped"),
        }
        let _ = handle.shutdown().await;
        Ok(())
    }

    /// Destroys every room. Their seats' connections close once the
    /// actors have stopped.
    pub async fn shutdown_all(&mut self) {
        let room_ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        tracing::info!(rooms = room_ids.len(), "shutting down every room");
        for room_id in room_ids {
            let _ = self.destroy_room(room_id).await;
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
