//! The seated players of one game and the actions that touch more than
//! one of them.

use crate::{Action, ActionOutcome, Place, Player, RuleConfig, RuleError, UpgradeKind};

/// The roster of one game instance plus its rules.
///
/// Players are kept in join order, which is also the stable order of
/// [`Room::alive_roster`].
#[derive(Debug, Clone)]
pub struct Room {
    config: RuleConfig,
    players: Vec<Player>,
    started: bool,
}

impl Room {
    /// Creates an empty room after validating `config`.
    pub fn new(config: RuleConfig) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self {
            players: Vec::with_capacity(config.player_count),
            config,
            started: false,
        })
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.player_count
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Seats a new player in the lowest free seat.
    pub fn add_player(&mut self, name: &str) -> Result<&Player, RuleError> {
        if self.started {
            return Err(RuleError::GameStarted);
        }
        if self.player(name).is_some() {
            return Err(RuleError::DuplicateName(name.to_string()));
        }
        let taken: Vec<u8> = self.players.iter().map(Player::seat).collect();
        let seat = (1..=self.capacity() as u8)
            .find(|seat| !taken.contains(seat))
            .ok_or(RuleError::RoomFull(self.capacity()))?;

        tracing::debug!(name, seat, "player seated");
        self.players.push(Player::new(name.to_string(), seat, &self.config));
        let index = self.players.len() - 1;
        Ok(&self.players[index])
    }

    /// Removes a player. Only allowed before the game starts.
    pub fn remove_player(&mut self, name: &str) -> Result<Player, RuleError> {
        if self.started {
            return Err(RuleError::GameStarted);
        }
        let index = self.index_of(name)?;
        Ok(self.players.remove(index))
    }

    /// Freezes membership. Later joins and leaves fail with
    /// [`RuleError::GameStarted`].
    pub fn begin_game(&mut self) {
        self.started = true;
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name() == name)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn alive_roster(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| p.is_alive()).collect()
    }

    /// Names of the living players, in seat order of joining.
    pub fn winners(&self) -> Vec<String> {
        self.alive_roster()
            .into_iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn is_round_over(&self) -> bool {
        self.alive_roster().len() <= 1
    }

    /// Every player, dead or alive, has every stat at its ceiling.
    pub fn is_game_over(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.is_maxed(&self.config))
    }

    /// Top-of-round reset for every player, the dead included.
    pub fn reset_round(&mut self) {
        for player in &mut self.players {
            player.reset_for_round();
        }
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Checks whether `actor` may take `action` right now.
    pub fn check(&self, actor: &str, action: &Action) -> Result<(), RuleError> {
        let player = self
            .player(actor)
            .ok_or_else(|| RuleError::UnknownPlayer(actor.to_string()))?;
        match action {
            Action::Pass => Ok(()),
            Action::BuyWeapon => player.check_buy_weapon(&self.config),
            Action::BuyMount => player.check_buy_mount(&self.config),
            Action::AttackMelee { target } => player.check_attack_melee(self.target(target)?),
            Action::AttackMount { target } => player.check_attack_mount(self.target(target)?),
            Action::Move { place } => {
                self.check_place(*place)?;
                player.check_move(*place)
            }
            Action::ForceMove { target, place } => {
                self.check_place(*place)?;
                player.check_force_move(self.target(target)?, *place, &self.config)
            }
        }
    }

    /// Applies `action` for `actor`, or fails without touching any state.
    pub fn apply(&mut self, actor: &str, action: &Action) -> Result<ActionOutcome, RuleError> {
        self.check(actor, action)?;
        let a = self.index_of(actor)?;
        let mut outcome = ActionOutcome::default();

        match action {
            Action::Pass => {}
            Action::BuyWeapon => self.players[a].buy_weapon(),
            Action::BuyMount => self.players[a].buy_mount(),
            Action::Move { place } => outcome.moves.push(self.players[a].relocate(*place)),
            Action::AttackMelee { target } => {
                let t = self.index_of(target)?;
                let (attacker, victim) = pair_mut(&mut self.players, a, t);
                outcome
                    .hits
                    .push(victim.take_damage(attacker.melee_damage(), attacker.name()));

                if !attacker.place().is_hub() {
                    let punishment = self
                        .config
                        .punish_rounding
                        .apply(attacker.max_hp(), self.config.punish_modifier);
                    if punishment > 0 {
                        outcome
                            .hits
                            .push(attacker.take_damage(punishment, victim.name()));
                    }
                }
            }
            Action::AttackMount { target } => {
                let t = self.index_of(target)?;
                let (attacker, victim) = pair_mut(&mut self.players, a, t);
                outcome
                    .hits
                    .push(victim.take_damage(attacker.mount_damage(), attacker.name()));

                // The knock-back is a rule of the mount attack itself, so the
                // force-move toggle does not gate it.
                if victim.check_move(Place::Country).is_ok() {
                    outcome.moves.push(victim.relocate(Place::Country));
                }
            }
            Action::ForceMove { target, place } => {
                let t = self.index_of(target)?;
                outcome.moves.push(self.players[t].relocate(*place));
            }
        }

        self.credit_kills(&outcome);
        tracing::debug!(
            actor,
            action = ?action.kind(),
            hits = outcome.hits.len(),
            moves = outcome.moves.len(),
            "action applied"
        );
        Ok(outcome)
    }

    fn credit_kills(&mut self, outcome: &ActionOutcome) {
        for hit in outcome.hits.iter().filter(|hit| hit.killed) {
            if let Some(dealer) = self.players.iter_mut().find(|p| p.name() == hit.dealer) {
                dealer.grant_point();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Upgrades
    // -------------------------------------------------------------------------

    /// Checks an upgrade batch without applying it.
    pub fn check_upgrades(&self, name: &str, kinds: &[UpgradeKind]) -> Result<(), RuleError> {
        self.stage_upgrades(name, kinds).map(|_| ())
    }

    /// Spends every upgrade point of `name` on `kinds`, all or nothing.
    pub fn apply_upgrades(&mut self, name: &str, kinds: &[UpgradeKind]) -> Result<(), RuleError> {
        let (index, staged) = self.stage_upgrades(name, kinds)?;
        self.players[index] = staged;
        tracing::debug!(name, ?kinds, "upgrades applied");
        Ok(())
    }

    /// Applies the selections of `kinds` that still fit under their
    /// ceilings, in order, and forfeits any points left over. Returns what
    /// was applied.
    pub fn apply_upgrades_saturating(
        &mut self,
        name: &str,
        kinds: &[UpgradeKind],
    ) -> Result<Vec<UpgradeKind>, RuleError> {
        let index = self.index_of(name)?;
        let player = &mut self.players[index];
        let budget = player.upgrade_points() as usize;
        let mut applied = Vec::with_capacity(budget);
        for kind in kinds.iter().take(budget) {
            if player.check_upgrade(*kind, &self.config).is_ok() {
                player.upgrade(*kind);
                applied.push(*kind);
            }
        }
        let forfeited = budget - applied.len();
        if forfeited > 0 {
            tracing::warn!(name, forfeited, "upgrade points forfeited");
        }
        player.clear_points();
        Ok(applied)
    }

    fn stage_upgrades(&self, name: &str, kinds: &[UpgradeKind]) -> Result<(usize, Player), RuleError> {
        let index = self.index_of(name)?;
        let mut staged = self.players[index].clone();
        if kinds.len() != staged.upgrade_points() as usize {
            return Err(RuleError::PointMismatch {
                player: name.to_string(),
                held: staged.upgrade_points(),
                selected: kinds.len(),
            });
        }
        for kind in kinds {
            staged.check_upgrade(*kind, &self.config)?;
            staged.upgrade(*kind);
        }
        staged.clear_points();
        Ok((index, staged))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn index_of(&self, name: &str) -> Result<usize, RuleError> {
        self.players
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| RuleError::UnknownPlayer(name.to_string()))
    }

    fn target(&self, name: &str) -> Result<&Player, RuleError> {
        self.player(name)
            .ok_or_else(|| RuleError::UnknownPlayer(name.to_string()))
    }

    fn check_place(&self, place: Place) -> Result<(), RuleError> {
        match place {
            Place::City(seat) if seat as usize > self.capacity() => Err(RuleError::NoSuchPlace(place)),
            _ => Ok(()),
        }
    }
}

/// Borrows two distinct players mutably.
fn pair_mut(players: &mut [Player], a: usize, b: usize) -> (&mut Player, &mut Player) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = players.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = players.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PunishRounding;

    fn room_with(config: RuleConfig, names: &[&str]) -> Room {
        let mut room = Room::new(config).unwrap();
        for name in names {
            room.add_player(name).unwrap();
        }
        room
    }

    fn two_player(config: RuleConfig) -> Room {
        room_with(
            RuleConfig {
                player_count: 2,
                ..config
            },
            &["a", "b"],
        )
    }

    fn melee(target: &str) -> Action {
        Action::AttackMelee {
            target: target.into(),
        }
    }

    /// Puts `name` in `place` and hands them a weapon and a mount.
    fn arm_at(room: &mut Room, name: &str, place: Place) {
        let i = room.index_of(name).unwrap();
        room.players[i].relocate(place);
        room.players[i].buy_weapon();
        room.players[i].buy_mount();
    }

    // =========================================================================
    // Roster
    // =========================================================================

    #[test]
    fn test_add_player_assigns_seats_in_join_order() {
        let room = room_with(RuleConfig::default(), &["a", "b", "c"]);
        let seats: Vec<_> = room.players().iter().map(|p| (p.name(), p.seat())).collect();
        assert_eq!(seats, vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(room.player("b").unwrap().home(), Place::City(2));
    }

    #[test]
    fn test_add_player_duplicate_name_fails() {
        let mut room = room_with(RuleConfig::default(), &["a"]);
        assert_eq!(
            room.add_player("a").unwrap_err(),
            RuleError::DuplicateName("a".into())
        );
    }

    #[test]
    fn test_add_player_over_capacity_fails() {
        let mut room = two_player(RuleConfig::default());
        assert!(room.is_full());
        assert_eq!(room.add_player("c").unwrap_err(), RuleError::RoomFull(2));
    }

    #[test]
    fn test_remove_player_frees_seat_for_reuse() {
        let mut room = room_with(RuleConfig::default(), &["a", "b", "c"]);
        room.remove_player("b").unwrap();
        let d = room.add_player("d").unwrap();
        assert_eq!(d.seat(), 2);
    }

    #[test]
    fn test_remove_player_after_start_fails() {
        let mut room = two_player(RuleConfig::default());
        room.begin_game();
        assert_eq!(room.remove_player("a").unwrap_err(), RuleError::GameStarted);
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_new_invalid_config_fails() {
        let config = RuleConfig {
            player_count: 1,
            ..Default::default()
        };
        assert!(Room::new(config).is_err());
    }

    // =========================================================================
    // Melee and punishment
    // =========================================================================

    #[test]
    fn test_apply_melee_kill_in_city_credits_attacker_and_punishes() {
        let config = RuleConfig {
            start_hp: 1,
            melee_damage: 1,
            max_hp_ceiling: 6,
            ..Default::default()
        };
        let mut room = two_player(config);
        // A gets some extra max HP so the punishment does not kill them.
        let a = room.index_of("a").unwrap();
        for _ in 0..5 {
            room.players[a].upgrade(UpgradeKind::MaxHp);
        }
        room.reset_round();
        arm_at(&mut room, "a", Place::City(1));
        let b = room.index_of("b").unwrap();
        room.players[b].relocate(Place::City(1));

        let outcome = room.apply("a", &melee("b")).unwrap();

        let b = room.player("b").unwrap();
        assert_eq!(b.hp(), 0);
        assert!(!b.is_alive());
        let a = room.player("a").unwrap();
        assert_eq!(a.upgrade_points(), 1);
        // max HP 6, modifier 3, round down: punished 2.
        assert_eq!(a.hp(), 4);
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[1].victim, "a");
        assert_eq!(outcome.hits[1].dealer, "b");
        assert!(room.is_round_over());
    }

    #[test]
    fn test_apply_melee_in_hub_has_no_punishment() {
        let mut room = two_player(RuleConfig::default());
        arm_at(&mut room, "a", Place::Country);
        room.players[1].relocate(Place::Country);

        let outcome = room.apply("a", &melee("b")).unwrap();
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(room.player("a").unwrap().hp(), 10);
        assert_eq!(room.player("b").unwrap().hp(), 8);
    }

    #[test]
    fn test_apply_melee_punishment_table() {
        let cases = [
            (10, PunishRounding::RoundDown, 7),
            (10, PunishRounding::RoundHalfUp, 7),
            (10, PunishRounding::Ceiling, 6),
            (10, PunishRounding::FloorPlusOne, 6),
            (9, PunishRounding::RoundDown, 6),
            (9, PunishRounding::RoundHalfUp, 6),
            (9, PunishRounding::Ceiling, 6),
            (9, PunishRounding::FloorPlusOne, 6),
        ];
        for (max_hp, rounding, expected) in cases {
            let mut room = two_player(RuleConfig {
                start_hp: max_hp,
                punish_modifier: 3,
                punish_rounding: rounding,
                ..Default::default()
            });
            arm_at(&mut room, "a", Place::City(2));
            room.apply("a", &melee("b")).unwrap();
            assert_eq!(
                room.player("a").unwrap().hp(),
                expected,
                "max_hp {max_hp} {rounding:?}"
            );
        }
    }

    #[test]
    fn test_apply_melee_fatal_punishment_credits_original_target() {
        let mut room = two_player(RuleConfig {
            start_hp: 3,
            melee_damage: 1,
            punish_modifier: 1,
            ..Default::default()
        });
        arm_at(&mut room, "a", Place::City(2));

        let outcome = room.apply("a", &melee("b")).unwrap();

        assert!(!room.player("a").unwrap().is_alive());
        assert!(room.player("b").unwrap().is_alive());
        assert_eq!(room.player("b").unwrap().upgrade_points(), 1);
        assert_eq!(room.player("a").unwrap().upgrade_points(), 0);
        assert!(outcome.hits[1].killed);
        assert_eq!(room.winners(), vec!["b".to_string()]);
    }

    #[test]
    fn test_apply_illegal_action_leaves_state_untouched() {
        let mut room = two_player(RuleConfig::default());
        let before = room.players().to_vec();
        assert!(room.apply("a", &melee("b")).is_err());
        assert!(room.apply("a", &melee("a")).is_err());
        assert!(room.apply("zed", &Action::Pass).is_err());
        assert_eq!(room.players(), before.as_slice());
    }

    // =========================================================================
    // Mount attack, movement
    // =========================================================================

    #[test]
    fn test_apply_mount_attack_knocks_target_to_hub() {
        let mut room = two_player(RuleConfig::default());
        arm_at(&mut room, "a", Place::City(2));

        let outcome = room
            .apply("a", &Action::AttackMount { target: "b".into() })
            .unwrap();

        let b = room.player("b").unwrap();
        assert_eq!(b.hp(), 9);
        assert_eq!(b.place(), Place::Country);
        assert_eq!(outcome.moves.len(), 1);
        assert_eq!(outcome.moves[0].from, Place::City(2));
    }

    #[test]
    fn test_apply_mount_attack_knockback_ignores_force_move_toggle() {
        let mut room = two_player(RuleConfig {
            force_move_enabled: false,
            ..Default::default()
        });
        arm_at(&mut room, "a", Place::City(2));
        room.apply("a", &Action::AttackMount { target: "b".into() })
            .unwrap();
        assert_eq!(room.player("b").unwrap().place(), Place::Country);
    }

    #[test]
    fn test_apply_mount_attack_dead_target_stays_put() {
        let mut room = two_player(RuleConfig {
            start_hp: 1,
            ..Default::default()
        });
        arm_at(&mut room, "a", Place::City(2));
        let outcome = room
            .apply("a", &Action::AttackMount { target: "b".into() })
            .unwrap();
        assert!(outcome.moves.is_empty());
        assert_eq!(room.player("b").unwrap().place(), Place::City(2));
        assert_eq!(room.player("a").unwrap().upgrade_points(), 1);
    }

    #[test]
    fn test_apply_move_to_missing_city_fails() {
        let mut room = two_player(RuleConfig::default());
        room.apply("a", &Action::Move {
            place: Place::Country,
        })
        .unwrap();
        assert_eq!(
            room.apply("a", &Action::Move { place: Place::City(5) })
                .unwrap_err(),
            RuleError::NoSuchPlace(Place::City(5))
        );
    }

    #[test]
    fn test_apply_force_move_relocates_target() {
        let mut room = two_player(RuleConfig::default());
        room.apply("a", &Action::Move {
            place: Place::Country,
        })
        .unwrap();
        let outcome = room
            .apply("a", &Action::ForceMove {
                target: "b".into(),
                place: Place::Country,
            })
            .unwrap();
        assert_eq!(room.player("b").unwrap().place(), Place::Country);
        assert_eq!(outcome.moves[0].player, "b");
    }

    // =========================================================================
    // Round and game over
    // =========================================================================

    #[test]
    fn test_is_round_over_when_one_left() {
        let mut room = room_with(
            RuleConfig {
                player_count: 3,
                start_hp: 2,
                melee_damage: 2,
                ..Default::default()
            },
            &["a", "b", "c"],
        );
        arm_at(&mut room, "a", Place::Country);
        room.players[1].relocate(Place::Country);
        room.players[2].relocate(Place::Country);

        room.apply("a", &melee("b")).unwrap();
        assert!(!room.is_round_over());
        room.apply("a", &melee("c")).unwrap();
        assert!(room.is_round_over());
        assert_eq!(room.winners(), vec!["a".to_string()]);

        room.reset_round();
        assert_eq!(room.alive_roster().len(), 3);
    }

    #[test]
    fn test_is_game_over_requires_everyone_maxed() {
        let config = RuleConfig {
            player_count: 2,
            start_hp: 1,
            max_hp_ceiling: 1,
            melee_damage: 1,
            melee_damage_ceiling: 2,
            mount_damage: 1,
            mount_damage_ceiling: 1,
            ..Default::default()
        };
        let mut room = two_player(config);
        assert!(!room.is_game_over());

        room.players[0].upgrade(UpgradeKind::Weapon);
        assert!(!room.is_game_over());
        room.players[1].upgrade(UpgradeKind::Weapon);
        assert!(room.is_game_over());
    }

    // =========================================================================
    // Upgrades
    // =========================================================================

    #[test]
    fn test_apply_upgrades_spends_exact_points() {
        let mut room = two_player(RuleConfig::default());
        room.players[0].grant_point();
        room.players[0].grant_point();

        room.apply_upgrades("a", &[UpgradeKind::Weapon, UpgradeKind::Weapon])
            .unwrap();

        let a = room.player("a").unwrap();
        assert_eq!(a.melee_damage(), 4);
        assert_eq!(a.upgrade_points(), 0);
    }

    #[test]
    fn test_apply_upgrades_count_mismatch_fails() {
        let mut room = two_player(RuleConfig::default());
        room.players[0].grant_point();
        let err = room
            .apply_upgrades("a", &[UpgradeKind::MaxHp, UpgradeKind::MaxHp])
            .unwrap_err();
        assert!(matches!(err, RuleError::PointMismatch { held: 1, selected: 2, .. }));
    }

    #[test]
    fn test_apply_upgrades_past_ceiling_is_atomic() {
        let mut room = two_player(RuleConfig {
            mount_damage: 1,
            mount_damage_ceiling: 2,
            ..Default::default()
        });
        room.players[0].grant_point();
        room.players[0].grant_point();
        let before = room.player("a").unwrap().clone();

        let err = room
            .apply_upgrades("a", &[UpgradeKind::Mount, UpgradeKind::Mount])
            .unwrap_err();

        assert!(matches!(err, RuleError::AtCeiling { kind: UpgradeKind::Mount, .. }));
        assert_eq!(room.player("a").unwrap(), &before);
    }

    #[test]
    fn test_apply_upgrades_saturating_skips_full_stats_and_clears_points() {
        let mut room = two_player(RuleConfig {
            mount_damage: 1,
            mount_damage_ceiling: 2,
            ..Default::default()
        });
        for _ in 0..3 {
            room.players[0].grant_point();
        }

        let applied = room
            .apply_upgrades_saturating(
                "a",
                &[UpgradeKind::Mount, UpgradeKind::Mount, UpgradeKind::MaxHp],
            )
            .unwrap();

        assert_eq!(applied, vec![UpgradeKind::Mount, UpgradeKind::MaxHp]);
        let a = room.player("a").unwrap();
        assert_eq!(a.mount_damage(), 2);
        assert_eq!(a.max_hp(), 11);
        assert_eq!(a.upgrade_points(), 0);
    }
}
