//! The turn-resolution state machine.

use std::collections::BTreeMap;
use std::fmt;

use skirmish_rules::{
    Action, ActionOutcome, HandSign, Player, Room, RuleConfig, UpgradeKind, resolve_hands,
};

use crate::{
    Acted, Broadcast, GameOver, HandSigns, LogicError, OrderConfirmed, Phase, Reply, Request,
    RoundOver, RoundStarted, ShownSign, Transition, Upgraded,
};

type Observer = Box<dyn FnMut(&Broadcast) + Send>;

/// A slot claimed by more than one player.
#[derive(Debug, Clone)]
struct Contest {
    slot: u32,
    contenders: Vec<String>,
}

/// Drives one room through rounds of ordering, acting, and upgrading.
///
/// See the crate docs for the pull protocol.
pub struct Logic {
    room: Room,
    phase: Phase,
    round: u32,

    outstanding: BTreeMap<String, Request>,
    replies: BTreeMap<String, Reply>,

    /// Players without a slot this turn, in seat order.
    pool: Vec<String>,
    slot_count: u32,
    order: BTreeMap<u32, String>,
    claims: Vec<(String, Vec<u32>)>,
    contest: Option<Contest>,
    acting: Option<u32>,

    observers: Vec<Observer>,
}

impl fmt::Debug for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logic")
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("outstanding", &self.outstanding)
            .field("order", &self.order)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Logic {
    /// Creates a state machine over an empty room.
    pub fn new(config: RuleConfig) -> Result<Self, LogicError> {
        Ok(Self::with_room(Room::new(config)?))
    }

    /// Creates a state machine over an existing room.
    pub fn with_room(room: Room) -> Self {
        Self {
            room,
            phase: Phase::BeforeRound,
            round: 0,
            outstanding: BTreeMap::new(),
            replies: BTreeMap::new(),
            pool: Vec::new(),
            slot_count: 0,
            order: BTreeMap::new(),
            claims: Vec::new(),
            contest: None,
            acting: None,
            observers: Vec::new(),
        }
    }

    /// Seats a player. Fails once the game has started.
    pub fn add_player(&mut self, name: &str) -> Result<&Player, LogicError> {
        Ok(self.room.add_player(name)?)
    }

    /// Unseats a player. Fails once the game has started.
    pub fn remove_player(&mut self, name: &str) -> Result<Player, LogicError> {
        Ok(self.room.remove_player(name)?)
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round, starting at 1. Zero before the game starts.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Confirmed slot owners of the current turn.
    pub fn order(&self) -> &BTreeMap<u32, String> {
        &self.order
    }

    /// The unanswered request for `player`, if any.
    pub fn request_for(&self, player: &str) -> Option<&Request> {
        self.outstanding.get(player)
    }

    /// Every unanswered request.
    pub fn outstanding(&self) -> impl Iterator<Item = (&str, &Request)> {
        self.outstanding.iter().map(|(name, req)| (name.as_str(), req))
    }

    /// Every outstanding request has been answered.
    pub fn is_ready(&self) -> bool {
        self.outstanding.is_empty() && !self.replies.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Registers a callback invoked for every broadcast.
    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(&Broadcast) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    // -------------------------------------------------------------------------
    // Pull API
    // -------------------------------------------------------------------------

    /// Freezes the roster and begins round 1.
    pub fn start(&mut self) -> Result<Transition, LogicError> {
        if self.room.is_started() {
            return Err(LogicError::AlreadyStarted);
        }
        if self.room.len() < 2 {
            return Err(LogicError::NotEnoughPlayers(self.room.len()));
        }
        self.room.begin_game();
        tracing::info!(players = self.room.len(), "game started");

        let mut t = Transition::default();
        self.begin_round(&mut t);
        Ok(self.emit(t))
    }

    /// Records `player`'s answer to their outstanding request.
    ///
    /// The reply is checked against the request and the rules; a rejected
    /// reply leaves the request outstanding.
    pub fn submit(&mut self, player: &str, reply: Reply) -> Result<(), LogicError> {
        let request = self
            .outstanding
            .get(player)
            .ok_or_else(|| LogicError::NotAwaiting(player.to_string()))?;
        self.validate(player, request, &reply)?;

        self.outstanding.remove(player);
        self.replies.insert(player.to_string(), reply);
        Ok(())
    }

    /// Records the last-resort answer for `player`: stone, no claim, pass,
    /// or whatever upgrades still fit.
    pub fn fallback(&mut self, player: &str) -> Result<(), LogicError> {
        let request = self
            .outstanding
            .remove(player)
            .ok_or_else(|| LogicError::NotAwaiting(player.to_string()))?;
        let reply = match request {
            Request::HandSign => Reply::HandSign(HandSign::Stone),
            Request::OrderClaim { .. } => Reply::OrderClaim(Vec::new()),
            Request::Action => Reply::Action(Action::Pass),
            Request::Upgrade { points } => Reply::Upgrade(self.fitting_upgrades(player, points)),
        };
        tracing::warn!(player, kind = %reply.kind(), "fallback reply recorded");
        self.replies.insert(player.to_string(), reply);
        Ok(())
    }

    /// Resolves the current phase with the collected replies.
    pub fn advance(&mut self) -> Result<Transition, LogicError> {
        match self.phase {
            Phase::GameOver => return Err(LogicError::Finished),
            _ if !self.outstanding.is_empty() || self.replies.is_empty() => {
                return Err(LogicError::NotReady(self.outstanding.len()));
            }
            _ => {}
        }

        let replies = std::mem::take(&mut self.replies);
        let mut t = Transition::default();
        match self.phase {
            Phase::TieBreakForOrder => self.resolve_order_tie_break(&replies, &mut t),
            Phase::OrderClaim => self.resolve_claims(replies, &mut t),
            Phase::TieBreakForOrderClaim => self.resolve_slot_tie_break(&replies, &mut t),
            Phase::Acting => self.resolve_action(replies, &mut t),
            Phase::Upgrading => self.resolve_upgrades(replies, &mut t),
            Phase::BeforeRound | Phase::GameOver => {}
        }
        Ok(self.emit(t))
    }

    fn emit(&mut self, t: Transition) -> Transition {
        for broadcast in &t.broadcasts {
            for observer in &mut self.observers {
                observer(broadcast);
            }
        }
        t
    }

    fn issue(&mut self, player: String, request: Request, t: &mut Transition) {
        tracing::debug!(player, kind = %request.kind(), "request issued");
        self.outstanding.insert(player.clone(), request.clone());
        t.requests.push((player, request));
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate(&self, player: &str, request: &Request, reply: &Reply) -> Result<(), LogicError> {
        match (request, reply) {
            (Request::HandSign, Reply::HandSign(_)) => Ok(()),
            (Request::OrderClaim { open_slots, tokens }, Reply::OrderClaim(slots)) => {
                check_claim(player, open_slots, *tokens, slots)
            }
            (Request::Action, Reply::Action(action)) => Ok(self.room.check(player, action)?),
            (Request::Upgrade { .. }, Reply::Upgrade(kinds)) => {
                Ok(self.room.check_upgrades(player, kinds)?)
            }
            (request, _) => Err(LogicError::UnexpectedReply {
                player: player.to_string(),
                expected: request.kind(),
            }),
        }
    }

    /// Up to `points` upgrades that fit under the ceilings, max HP first.
    fn fitting_upgrades(&self, player: &str, points: u32) -> Vec<UpgradeKind> {
        let Some(p) = self.room.player(player) else {
            return Vec::new();
        };
        let config = self.room.config();
        let mut headroom = [UpgradeKind::MaxHp, UpgradeKind::Weapon, UpgradeKind::Mount]
            .map(|kind| (kind, p.headroom(kind, config)));

        let mut picks = Vec::new();
        for _ in 0..points {
            match headroom.iter_mut().find(|(_, left)| *left > 0) {
                Some((kind, left)) => {
                    *left -= 1;
                    picks.push(*kind);
                }
                None => break,
            }
        }
        picks
    }

    // -------------------------------------------------------------------------
    // Round and turn structure
    // -------------------------------------------------------------------------

    fn begin_round(&mut self, t: &mut Transition) {
        self.round += 1;
        self.phase = Phase::BeforeRound;
        self.room.reset_round();
        tracing::info!(round = self.round, "round started");
        t.broadcast(Broadcast::RoundStarted(RoundStarted {
            round: self.round,
            players: self.room.players().to_vec(),
        }));
        self.begin_turn(t);
    }

    fn begin_turn(&mut self, t: &mut Transition) {
        self.order.clear();
        self.claims.clear();
        self.contest = None;
        self.acting = None;
        self.pool = self.room.winners();
        self.slot_count = self.pool.len() as u32;
        self.continue_ordering(t);
    }

    fn end_turn(&mut self, t: &mut Transition) {
        if !self.room.is_round_over() {
            self.begin_turn(t);
            return;
        }
        let survivors = self.room.winners();
        tracing::info!(round = self.round, ?survivors, "round over");
        t.broadcast(Broadcast::RoundOver(RoundOver {
            round: self.round,
            survivors,
        }));
        self.begin_upgrading(t);
    }

    fn finish_round(&mut self, t: &mut Transition) {
        if !self.room.is_game_over() {
            self.begin_round(t);
            return;
        }
        self.phase = Phase::GameOver;
        let winners = self.room.winners();
        tracing::info!(rounds = self.round, ?winners, "game over");
        t.broadcast(Broadcast::GameOver(GameOver { winners }));
    }

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------

    fn open_slots(&self) -> Vec<u32> {
        (1..=self.slot_count)
            .filter(|slot| !self.order.contains_key(slot))
            .collect()
    }

    fn request_hand_signs(&mut self, phase: Phase, players: Vec<String>, t: &mut Transition) {
        self.phase = phase;
        for player in players {
            self.issue(player, Request::HandSign, t);
        }
    }

    /// Hands out the remaining slots: a lone player takes the last one,
    /// otherwise the pool runs another tie-break.
    fn continue_ordering(&mut self, t: &mut Transition) {
        loop {
            let open = self.open_slots();
            if open.is_empty() || self.pool.is_empty() {
                self.begin_acting(t);
                return;
            }
            if self.pool.len() == 1 {
                let last = self.pool[0].clone();
                self.confirm(open[0], &last);
                continue;
            }
            self.request_hand_signs(Phase::TieBreakForOrder, self.pool.clone(), t);
            return;
        }
    }

    fn resolve_order_tie_break(&mut self, replies: &BTreeMap<String, Reply>, t: &mut Transition) {
        let hands = shown_signs(&self.pool, replies);
        let outcome = resolve_hands(&hands);
        let open = self.open_slots();
        let tokens = outcome
            .as_ref()
            .map_or(0, |o| o.tokens().min(open.len()));

        t.broadcast(Broadcast::HandSigns(HandSigns {
            slot: None,
            signs: to_shown(hands),
            winners: outcome.as_ref().map(|o| o.winners.clone()).unwrap_or_default(),
            tokens,
        }));

        let Some(outcome) = outcome else {
            tracing::debug!("order tie-break unresolved");
            self.request_hand_signs(Phase::TieBreakForOrder, self.pool.clone(), t);
            return;
        };
        self.phase = Phase::OrderClaim;
        for winner in outcome.winners {
            let request = Request::OrderClaim {
                open_slots: open.clone(),
                tokens,
            };
            self.issue(winner, request, t);
        }
    }

    fn resolve_claims(&mut self, mut replies: BTreeMap<String, Reply>, t: &mut Transition) {
        self.claims = self
            .pool
            .iter()
            .filter_map(|name| match replies.remove(name) {
                Some(Reply::OrderClaim(slots)) => Some((name.clone(), slots)),
                _ => None,
            })
            .collect();
        self.scan_claims(t);
    }

    /// Walks the open slots in increasing order, confirming uncontested
    /// claims until it hits a contested slot.
    fn scan_claims(&mut self, t: &mut Transition) {
        for slot in self.open_slots() {
            let mut claimants: Vec<String> = self
                .claims
                .iter()
                .filter(|(_, slots)| slots.contains(&slot))
                .map(|(name, _)| name.clone())
                .collect();
            match claimants.len() {
                0 => {}
                1 => {
                    let owner = claimants.remove(0);
                    self.confirm(slot, &owner);
                }
                _ => {
                    tracing::debug!(slot, ?claimants, "slot contested");
                    self.contest = Some(Contest {
                        slot,
                        contenders: claimants.clone(),
                    });
                    self.request_hand_signs(Phase::TieBreakForOrderClaim, claimants, t);
                    return;
                }
            }
        }
        self.claims.clear();
        self.continue_ordering(t);
    }

    fn resolve_slot_tie_break(&mut self, replies: &BTreeMap<String, Reply>, t: &mut Transition) {
        let Some(contest) = self.contest.take() else {
            self.scan_claims(t);
            return;
        };
        let hands = shown_signs(&contest.contenders, replies);
        let outcome = resolve_hands(&hands);

        t.broadcast(Broadcast::HandSigns(HandSigns {
            slot: Some(contest.slot),
            signs: to_shown(hands),
            winners: outcome.as_ref().map(|o| o.winners.clone()).unwrap_or_default(),
            tokens: 0,
        }));

        let Some(outcome) = outcome else {
            let contenders = contest.contenders.clone();
            self.contest = Some(contest);
            self.request_hand_signs(Phase::TieBreakForOrderClaim, contenders, t);
            return;
        };
        for (name, slots) in &mut self.claims {
            if outcome.losers.contains(name) {
                slots.retain(|slot| *slot != contest.slot);
            }
        }
        self.scan_claims(t);
    }

    /// Gives `slot` to `player` and withdraws their other claims.
    fn confirm(&mut self, slot: u32, player: &str) {
        tracing::debug!(slot, player, "slot confirmed");
        self.order.insert(slot, player.to_string());
        self.pool.retain(|name| name != player);
        self.claims.retain(|(name, _)| name != player);
    }

    // -------------------------------------------------------------------------
    // Acting
    // -------------------------------------------------------------------------

    fn begin_acting(&mut self, t: &mut Transition) {
        self.phase = Phase::Acting;
        self.acting = None;
        let order: Vec<String> = self.order.values().cloned().collect();
        tracing::debug!(round = self.round, ?order, "order confirmed");
        t.broadcast(Broadcast::OrderConfirmed(OrderConfirmed { order }));
        self.next_actor(t);
    }

    /// Requests an action from the next living slot owner, or ends the
    /// turn when every slot has gone.
    fn next_actor(&mut self, t: &mut Transition) {
        let first = self.acting.map_or(1, |slot| slot + 1);
        for slot in first..=self.slot_count {
            let Some(name) = self.order.get(&slot) else {
                continue;
            };
            if self.room.player(name).is_some_and(Player::is_alive) {
                let name = name.clone();
                self.acting = Some(slot);
                self.issue(name, Request::Action, t);
                return;
            }
            tracing::debug!(slot, player = %name, "dead player skipped");
        }
        self.acting = None;
        self.end_turn(t);
    }

    fn resolve_action(&mut self, mut replies: BTreeMap<String, Reply>, t: &mut Transition) {
        let Some((slot, name)) = self
            .acting
            .and_then(|slot| self.order.get(&slot).map(|name| (slot, name.clone())))
        else {
            self.end_turn(t);
            return;
        };
        let action = match replies.remove(&name) {
            Some(Reply::Action(action)) => action,
            _ => Action::Pass,
        };
        let (action, outcome) = match self.room.apply(&name, &action) {
            Ok(outcome) => (action, outcome),
            Err(err) => {
                tracing::warn!(player = %name, error = %err, "action refused, passing");
                (Action::Pass, ActionOutcome::default())
            }
        };
        t.broadcast(Broadcast::Acted(Acted {
            slot,
            player: name,
            action,
            outcome,
        }));
        self.next_actor(t);
    }

    // -------------------------------------------------------------------------
    // Upgrading
    // -------------------------------------------------------------------------

    fn begin_upgrading(&mut self, t: &mut Transition) {
        self.phase = Phase::Upgrading;
        let owed: Vec<(String, u32)> = self
            .room
            .players()
            .iter()
            .filter(|p| p.upgrade_points() > 0)
            .map(|p| (p.name().to_string(), p.upgrade_points()))
            .collect();
        if owed.is_empty() {
            self.finish_round(t);
            return;
        }
        for (name, points) in owed {
            self.issue(name, Request::Upgrade { points }, t);
        }
    }

    fn resolve_upgrades(&mut self, mut replies: BTreeMap<String, Reply>, t: &mut Transition) {
        let names: Vec<String> = self
            .room
            .players()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        for name in names {
            let Some(Reply::Upgrade(kinds)) = replies.remove(&name) else {
                continue;
            };
            let upgrades = match self.room.apply_upgrades(&name, &kinds) {
                Ok(()) => kinds,
                Err(err) => {
                    tracing::warn!(player = %name, error = %err, "upgrade batch refused");
                    match self.room.apply_upgrades_saturating(&name, &kinds) {
                        Ok(applied) => applied,
                        Err(_) => continue,
                    }
                }
            };
            t.broadcast(Broadcast::Upgraded(Upgraded {
                player: name,
                upgrades,
            }));
        }
        self.finish_round(t);
    }
}

fn check_claim(
    player: &str,
    open_slots: &[u32],
    tokens: usize,
    slots: &[u32],
) -> Result<(), LogicError> {
    let invalid = |reason: String| LogicError::InvalidClaim {
        player: player.to_string(),
        reason,
    };
    if slots.len() > tokens {
        return Err(invalid(format!(
            "{} slots claimed with {tokens} tokens",
            slots.len()
        )));
    }
    for (i, slot) in slots.iter().enumerate() {
        if !open_slots.contains(slot) {
            return Err(invalid(format!("slot {slot} is not open")));
        }
        if slots[..i].contains(slot) {
            return Err(invalid(format!("slot {slot} claimed twice")));
        }
    }
    Ok(())
}

/// Hand signs of `players`, in their order, from the collected replies.
fn shown_signs(players: &[String], replies: &BTreeMap<String, Reply>) -> Vec<(String, HandSign)> {
    players
        .iter()
        .filter_map(|name| match replies.get(name) {
            Some(Reply::HandSign(sign)) => Some((name.clone(), *sign)),
            _ => None,
        })
        .collect()
}

fn to_shown(hands: Vec<(String, HandSign)>) -> Vec<ShownSign> {
    hands
        .into_iter()
        .map(|(player, sign)| ShownSign { player, sign })
        .collect()
}
