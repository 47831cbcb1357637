//! Room actor: an isolated Tokio task that runs one game.
//!
//! The actor owns the state machine and every seat's [`Agent`]. The
//! outside world talks to it through [`RoomHandle`]; the actor talks back
//! to connections only through the agents' packet channels, so a slow or
//! dead connection never stalls the room.
//!
//! The actor waits on its command channel, the earliest request deadline
//! among its agents, and the moment the state machine may take its next
//! transition. It takes at most one transition per loop turn and yields in
//! between, so commands are served while a game runs on default replies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use skirmish_logic::{Logic, LogicError, Reply, Transition};
use skirmish_protocol::{
    Chat, NotifyId, Packet, PlayerAdded, PlayerRemoved, RequestId, RoomId, SessionState, SignedIn,
    broadcast_packet,
};
use skirmish_rules::{Player, RuleError};
use skirmish_session::{Agent, PacketSender, default_reply};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{RoomConfig, RoomError, RoomState};

/// Everything a room needs to seat a newcomer.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub name: String,
    /// Shown to other seats; the name is used when absent.
    pub display_name: Option<String>,
    pub trusted: bool,
    /// Handed back in the `SignedIn` welcome.
    pub connection_id: String,
    /// Transport id of the joining connection.
    pub link: u64,
    pub sender: PacketSender,
}

/// Where a newcomer was seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seat {
    pub room_id: RoomId,
    pub seat: u8,
}

/// What a disconnect did to the seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The game had not started; the seat is gone.
    Released,
    /// The game goes on with defaults for this seat.
    Offline,
    /// The link was not the one bound to the seat (already replaced, or
    /// the seat no longer exists). Nothing changed.
    Stale,
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is the reply channel.
pub(crate) enum RoomCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },
    Reconnect {
        name: String,
        link: u64,
        sender: PacketSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnect {
        name: String,
        link: u64,
        reply: oneshot::Sender<Departure>,
    },
    /// A reply packet from a seat.
    Reply {
        name: String,
        id: RequestId,
        value: Value,
    },
    Chat {
        name: String,
        text: String,
    },
    SetTrusted {
        name: String,
        trusted: bool,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    pub player_count: usize,
    pub capacity: usize,
    /// Seats with a bound connection.
    pub online: usize,
    /// Zero before the game starts.
    pub round: u32,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone; the [`RoomManager`](crate::RoomManager) holds one per
/// room and connection handlers keep their own copy.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    state: watch::Receiver<RoomState>,
}

impl RoomHandle {
    pub(crate) fn new(
        room_id: RoomId,
        sender: mpsc::Sender<RoomCommand>,
        state: watch::Receiver<RoomState>,
    ) -> Self {
        Self {
            room_id,
            sender,
            state,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// The last lifecycle state the actor published. Reading it never
    /// waits on the actor.
    pub fn state(&self) -> RoomState {
        *self.state.borrow()
    }

    /// Still waiting for players and not yet exited.
    pub fn is_joinable(&self) -> bool {
        self.state().is_joinable() && !self.is_closed()
    }

    /// The actor has exited: game over, aborted, or shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Seats a newcomer. Only a waiting room accepts.
    pub async fn join(&self, request: JoinRequest) -> Result<Seat, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join { request, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Like [`join`](Self::join), but fails at once with
    /// [`RoomError::Unavailable`] instead of waiting for room in a full
    /// command channel.
    pub async fn try_join(&self, request: JoinRequest) -> Result<Seat, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .try_send(RoomCommand::Join { request, reply })
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Binds a new connection to the existing seat `name`.
    pub async fn reconnect(&self, name: &str, link: u64, sender: PacketSender) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Reconnect {
            name: name.to_string(),
            link,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Reports that connection `link` of seat `name` is gone.
    pub async fn disconnect(&self, name: &str, link: u64) -> Result<Departure, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Disconnect {
            name: name.to_string(),
            link,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Delivers a reply packet (fire-and-forget).
    pub async fn reply(&self, name: &str, id: RequestId, value: Value) -> Result<(), RoomError> {
        self.send(RoomCommand::Reply {
            name: name.to_string(),
            id,
            value,
        })
        .await
    }

    /// Relays a chat line to every seat (fire-and-forget).
    pub async fn chat(&self, name: &str, text: String) -> Result<(), RoomError> {
        self.send(RoomCommand::Chat {
            name: name.to_string(),
            text,
        })
        .await
    }

    /// Changes whether seat `name` answers its own requests.
    pub async fn set_trusted(&self, name: &str, trusted: bool) -> Result<(), RoomError> {
        self.send(RoomCommand::SetTrusted {
            name: name.to_string(),
            trusted,
        })
        .await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct RoomActor {
    room_id: RoomId,
    state: RoomState,
    /// Mirrors `state` for every [`RoomHandle`].
    published: watch::Sender<RoomState>,
    config: RoomConfig,
    logic: Logic,
    agents: BTreeMap<String, Agent>,
    /// Every recorded notify so far, replayed to newcomers and
    /// reconnecting seats.
    history: Vec<Packet>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// When the state machine last took a transition.
    last_step: Instant,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while !self.state.is_over() {
            let deadline = self.next_deadline();
            let step_at = self.next_step();
            tokio::select! {
                biased;
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_requests();
                }
                _ = tokio::time::sleep_until(step_at.unwrap_or_else(Instant::now)), if step_at.is_some() => {
                    self.step();
                    tokio::task::yield_now().await;
                }
            }
        }

        tracing::info!(room_id = %self.room_id, state = %self.state, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { request, reply } => {
                let _ = reply.send(self.handle_join(request));
            }
            RoomCommand::Reconnect {
                name,
                link,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_reconnect(&name, link, sender));
            }
            RoomCommand::Disconnect { name, link, reply } => {
                let _ = reply.send(self.handle_disconnect(&name, link));
            }
            RoomCommand::Reply { name, id, value } => self.handle_reply(&name, id, value),
            RoomCommand::Chat { name, text } => self.handle_chat(name, text),
            RoomCommand::SetTrusted { name, trusted } => self.handle_set_trusted(&name, trusted),
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                self.set_state(RoomState::Destroying);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Seats
    // -------------------------------------------------------------------------

    fn handle_join(&mut self, request: JoinRequest) -> Result<Seat, RoomError> {
        if !self.state.is_joinable() {
            return Err(RoomError::InvalidState {
                room_id: self.room_id,
                state: self.state,
            });
        }
        let seat = match self.logic.add_player(&request.name) {
            Ok(player) => player.seat(),
            Err(LogicError::Rule(RuleError::DuplicateName(name))) => {
                return Err(RoomError::NameTaken {
                    name,
                    room_id: self.room_id,
                });
            }
            Err(LogicError::Rule(RuleError::RoomFull(_))) => {
                return Err(RoomError::RoomFull(self.room_id));
            }
            Err(e) => return Err(e.into()),
        };

        let JoinRequest {
            name,
            display_name,
            trusted,
            connection_id,
            link,
            sender,
        } = request;
        let display_name = display_name.unwrap_or_else(|| name.clone());
        let mut agent = Agent::new(&name, &display_name, seat, self.config.request_timeout);
        agent.bind(link, sender, trusted);

        let welcome = SignedIn {
            room_id: self.room_id,
            seat,
            connection_id,
        };
        if let Some(packet) = notify(NotifyId::SignedIn, &welcome) {
            agent.send(packet);
        }
        for packet in &self.history {
            agent.send(packet.clone());
        }
        self.agents.insert(name.clone(), agent);

        tracing::info!(
            room_id = %self.room_id,
            player = %name,
            seat,
            players = self.agents.len(),
            "player joined"
        );
        self.broadcast(
            NotifyId::PlayerAdded,
            &PlayerAdded {
                name: name.clone(),
                display_name,
                seat,
            },
        );
        self.broadcast_status(&name);

        if self.logic.room().is_full() {
            self.start_game();
        }
        Ok(Seat {
            room_id: self.room_id,
            seat,
        })
    }

    fn handle_reconnect(&mut self, name: &str, link: u64, sender: PacketSender) -> Result<(), RoomError> {
        let agent = self.agents.get_mut(name).ok_or_else(|| RoomError::NotInRoom {
            name: name.to_string(),
            room_id: self.room_id,
        })?;
        for packet in &self.history {
            let _ = sender.send(packet.clone());
        }
        agent.bind(link, sender, true);
        tracing::info!(room_id = %self.room_id, player = name, "player reconnected");
        self.broadcast_status(name);
        Ok(())
    }

    fn handle_disconnect(&mut self, name: &str, link: u64) -> Departure {
        let Some(agent) = self.agents.get_mut(name) else {
            return Departure::Stale;
        };
        if !agent.is_bound_to(link) {
            return Departure::Stale;
        }

        if self.state.is_joinable() {
            self.agents.remove(name);
            if let Err(e) = self.logic.remove_player(name) {
                tracing::warn!(room_id = %self.room_id, player = name, error = %e, "seat release failed");
            }
            tracing::info!(room_id = %self.room_id, player = name, "player left before start");
            self.broadcast(
                NotifyId::PlayerRemoved,
                &PlayerRemoved {
                    name: name.to_string(),
                },
            );
            return Departure::Released;
        }

        let fallback = agent.disconnect();
        tracing::info!(room_id = %self.room_id, player = name, "player went offline");
        self.broadcast_status(name);

        if self.agents.values().all(|a| !a.is_online()) {
            tracing::warn!(room_id = %self.room_id, round = self.logic.round(), "every seat offline, game aborted");
            self.set_state(RoomState::Finished);
            return Departure::Offline;
        }
        if let Some(reply) = fallback {
            self.answer(name, reply);
        }
        Departure::Offline
    }

    fn handle_set_trusted(&mut self, name: &str, trusted: bool) {
        let Some(agent) = self.agents.get_mut(name) else {
            tracing::warn!(room_id = %self.room_id, player = name, "session state for unknown seat");
            return;
        };
        if agent.is_trusted() == trusted {
            return;
        }
        let fallback = agent.set_trusted(trusted);
        self.broadcast_status(name);
        if let Some(reply) = fallback {
            self.answer(name, reply);
        }
    }

    fn handle_chat(&mut self, name: String, text: String) {
        if !self.agents.contains_key(&name) {
            tracing::warn!(room_id = %self.room_id, player = %name, "chat from non-member, ignoring");
            return;
        }
        let chat = Chat {
            from: Some(name),
            text,
        };
        if let Some(packet) = notify(NotifyId::Chat, &chat) {
            self.send_all(&packet);
        }
    }

    // -------------------------------------------------------------------------
    // Game flow
    // -------------------------------------------------------------------------

    /// Moves the room along its lifecycle and publishes the new state.
    ///
    /// A change [`RoomState::can_transition_to`] does not allow is logged
    /// and ignored.
    fn set_state(&mut self, target: RoomState) {
        if !self.state.can_transition_to(target) {
            tracing::error!(room_id = %self.room_id, from = %self.state, to = %target, "illegal room state change ignored");
            return;
        }
        tracing::debug!(room_id = %self.room_id, from = %self.state, to = %target, "room state changed");
        self.state = target;
        self.published.send_replace(target);
    }

    fn start_game(&mut self) {
        self.set_state(RoomState::Starting);
        match self.logic.start() {
            Ok(transition) => {
                self.set_state(RoomState::InProgress);
                tracing::info!(room_id = %self.room_id, players = self.agents.len(), "game started");
                self.last_step = Instant::now();
                self.dispatch(transition);
            }
            Err(e) => {
                // Membership is frozen once full; there is nothing to wait for.
                tracing::error!(room_id = %self.room_id, error = %e, "game failed to start, room closed");
                self.set_state(RoomState::Finished);
            }
        }
    }

    fn handle_reply(&mut self, name: &str, id: RequestId, value: Value) {
        let Some(agent) = self.agents.get_mut(name) else {
            tracing::warn!(room_id = %self.room_id, player = name, "reply from non-member, ignoring");
            return;
        };
        let Some(reply) = agent.on_reply(id, value) else {
            return;
        };
        tracing::debug!(room_id = %self.room_id, player = name, kind = %reply.kind(), "reply received");
        self.answer(name, reply);
    }

    fn expire_requests(&mut self) {
        let now = Instant::now();
        let expired: Vec<(String, Reply)> = self
            .agents
            .iter_mut()
            .filter_map(|(name, agent)| agent.expire(now).map(|reply| (name.clone(), reply)))
            .collect();
        for (name, reply) in expired {
            self.answer(&name, reply);
        }
    }

    /// Feeds one answer to the state machine.
    ///
    /// A rejected answer is replaced by the default reply; if that is
    /// rejected too, the state machine's own fallback is recorded.
    fn answer(&mut self, name: &str, reply: Reply) {
        let error = match self.logic.submit(name, reply) {
            Ok(()) => return,
            Err(LogicError::NotAwaiting(_)) => {
                tracing::debug!(room_id = %self.room_id, player = name, "answer to nothing, dropped");
                return;
            }
            Err(e) => e,
        };
        tracing::warn!(room_id = %self.room_id, player = name, error = %error, "reply rejected, using default");

        if let Some(default) = self.logic.request_for(name).map(default_reply) {
            if self.logic.submit(name, default).is_ok() {
                return;
            }
        }
        if let Err(e) = self.logic.fallback(name) {
            tracing::warn!(room_id = %self.room_id, player = name, error = %e, "fallback failed");
        }
    }

    /// When the state machine may take its next transition, if it has
    /// every answer it needs.
    ///
    /// While a living player answers for themselves the game moves on at
    /// once. Otherwise every answer is a default, and the game advances at
    /// most once per request timeout until such a seat comes back.
    fn next_step(&self) -> Option<Instant> {
        if self.state != RoomState::InProgress || !self.logic.is_ready() {
            return None;
        }
        if self.is_steered() {
            Some(self.last_step)
        } else {
            Some(self.last_step + self.config.request_timeout)
        }
    }

    /// Some living player has an online, trusted seat.
    fn is_steered(&self) -> bool {
        let room = self.logic.room();
        self.agents.values().any(|agent| {
            agent.is_online() && agent.is_trusted() && room.player(agent.name()).is_some_and(Player::is_alive)
        })
    }

    /// Takes one transition.
    fn step(&mut self) {
        self.last_step = Instant::now();
        match self.logic.advance() {
            Ok(transition) => self.dispatch(transition),
            Err(e) => {
                tracing::error!(room_id = %self.room_id, error = %e, "state machine refused to advance, game aborted");
                self.set_state(RoomState::Finished);
            }
        }
    }

    /// Sends a transition's broadcasts, then hands out its requests.
    fn dispatch(&mut self, transition: Transition) {
        let game_over = transition.is_game_over();
        for broadcast in &transition.broadcasts {
            match broadcast_packet(broadcast) {
                Ok(packet) => self.record(packet),
                Err(e) => tracing::warn!(room_id = %self.room_id, error = %e, "broadcast encode failed"),
            }
        }
        if game_over {
            self.set_state(RoomState::Finished);
            tracing::info!(
                room_id = %self.room_id,
                round = self.logic.round(),
                winners = ?self.logic.room().winners(),
                "game finished"
            );
            return;
        }

        for (name, request) in transition.requests {
            let issued = match self.agents.get_mut(&name) {
                Some(agent) => agent.issue(request),
                None => {
                    tracing::warn!(room_id = %self.room_id, player = %name, "request for unseated player");
                    Ok(None)
                }
            };
            match issued {
                Ok(Some(reply)) => self.answer(&name, reply),
                Ok(None) if self.agents.contains_key(&name) => {}
                Ok(None) => self.fallback(&name),
                Err(e) => {
                    tracing::warn!(room_id = %self.room_id, player = %name, error = %e, "request encode failed");
                    self.fallback(&name);
                }
            }
        }
    }

    fn fallback(&mut self, name: &str) {
        if let Err(e) = self.logic.fallback(name) {
            tracing::warn!(room_id = %self.room_id, player = name, error = %e, "fallback failed");
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.agents.values().filter_map(Agent::deadline).min()
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    /// Builds a notify, records it in history, and sends it to every seat.
    fn broadcast<T: Serialize>(&mut self, id: NotifyId, payload: &T) {
        if let Some(packet) = notify(id, payload) {
            self.record(packet);
        }
    }

    fn broadcast_status(&mut self, name: &str) {
        let Some(agent) = self.agents.get(name) else {
            return;
        };
        let status = agent.status();
        self.broadcast(
            NotifyId::SessionStateChanged,
            &SessionState {
                name: name.to_string(),
                online: status.online,
                trusted: status.trusted,
            },
        );
    }

    fn record(&mut self, packet: Packet) {
        self.send_all(&packet);
        self.history.push(packet);
    }

    fn send_all(&self, packet: &Packet) {
        for agent in self.agents.values() {
            agent.send(packet.clone());
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id,
            state: self.state,
            player_count: self.agents.len(),
            capacity: self.config.capacity(),
            online: self.agents.values().filter(|a| a.is_online()).count(),
            round: self.logic.round(),
        }
    }
}

fn notify<T: Serialize>(id: NotifyId, payload: &T) -> Option<Packet> {
    match Packet::notify(id, payload) {
        Ok(packet) => Some(packet),
        Err(e) => {
            tracing::warn!(?id, error = %e, "notify encode failed");
            None
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig) -> Result<RoomHandle, RoomError> {
    let logic = Logic::new(config.rules.clone())?;
    let (tx, rx) = mpsc::channel(config.channel_size);
    let (published, state) = watch::channel(RoomState::WaitingForPlayers);

    let actor = RoomActor {
        room_id,
        state: RoomState::WaitingForPlayers,
        published,
        config,
        logic,
        agents: BTreeMap::new(),
        history: Vec::new(),
        receiver: rx,
        last_step: Instant::now(),
    };
    tokio::spawn(actor.run());

    Ok(RoomHandle::new(room_id, tx, state))
}
