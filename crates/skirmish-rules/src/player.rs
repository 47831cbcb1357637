//! One participant's combat stats and the legality checks that guard them.
//!
//! Checks live here because they only read state. Anything that mutates
//! two players at once (attacks, force-moves) is applied by [`Room`],
//! which can borrow both mutably.
//!
//! [`Room`]: crate::Room

use serde::{Deserialize, Serialize};

use crate::{Hit, Place, RuleConfig, RuleError, UpgradeKind};

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    name: String,
    seat: u8,
    hp: i32,
    max_hp: i32,
    has_weapon: bool,
    has_mount: bool,
    melee_damage: i32,
    mount_damage: i32,
    place: Place,
    upgrade_points: u32,
    #[serde(skip)]
    zero_hp_is_alive: bool,
}

impl Player {
    /// Creates a player in their home city with starting stats.
    pub(crate) fn new(name: String, seat: u8, config: &RuleConfig) -> Self {
        Self {
            name,
            seat,
            hp: config.start_hp,
            max_hp: config.start_hp,
            has_weapon: false,
            has_mount: false,
            melee_damage: config.melee_damage,
            mount_damage: config.mount_damage,
            place: Place::City(seat),
            upgrade_points: 0,
            zero_hp_is_alive: config.zero_hp_is_alive,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seat number, 1-based.
    pub fn seat(&self) -> u8 {
        self.seat
    }

    /// The city this player starts every round in.
    pub fn home(&self) -> Place {
        Place::City(self.seat)
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn has_weapon(&self) -> bool {
        self.has_weapon
    }

    pub fn has_mount(&self) -> bool {
        self.has_mount
    }

    pub fn melee_damage(&self) -> i32 {
        self.melee_damage
    }

    pub fn mount_damage(&self) -> i32 {
        self.mount_damage
    }

    pub fn place(&self) -> Place {
        self.place
    }

    pub fn upgrade_points(&self) -> u32 {
        self.upgrade_points
    }

    pub fn is_alive(&self) -> bool {
        if self.zero_hp_is_alive {
            self.hp >= 0
        } else {
            self.hp > 0
        }
    }

    /// Returns `true` when every upgradable stat sits at its ceiling.
    pub fn is_maxed(&self, config: &RuleConfig) -> bool {
        UpgradeKind::ALL
            .iter()
            .all(|kind| self.headroom(*kind, config) <= 0)
    }

    /// How many more times `kind` can be upgraded.
    pub fn headroom(&self, kind: UpgradeKind, config: &RuleConfig) -> i32 {
        Self::ceiling(kind, config) - self.stat(kind)
    }

    // -------------------------------------------------------------------------
    // Checks
    // -------------------------------------------------------------------------

    fn check_alive(&self) -> Result<(), RuleError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(RuleError::ActorDead(self.name.clone()))
        }
    }

    fn check_target(&self, target: &Player) -> Result<(), RuleError> {
        self.check_alive()?;
        if target.name == self.name {
            return Err(RuleError::SelfTarget(self.name.clone()));
        }
        if !target.is_alive() {
            return Err(RuleError::TargetDead(target.name.clone()));
        }
        Ok(())
    }

    fn check_buy(&self, owned: bool, item: &'static str, config: &RuleConfig) -> Result<(), RuleError> {
        self.check_alive()?;
        if owned {
            return Err(RuleError::AlreadyOwned {
                player: self.name.clone(),
                item,
            });
        }
        if config.buy_in_home_city_only && self.place != self.home() {
            return Err(RuleError::NotHome {
                player: self.name.clone(),
                home: self.home(),
            });
        }
        Ok(())
    }

    pub fn check_buy_weapon(&self, config: &RuleConfig) -> Result<(), RuleError> {
        self.check_buy(self.has_weapon, "weapon", config)
    }

    pub fn check_buy_mount(&self, config: &RuleConfig) -> Result<(), RuleError> {
        self.check_buy(self.has_mount, "mount", config)
    }

    pub fn check_attack_melee(&self, target: &Player) -> Result<(), RuleError> {
        self.check_target(target)?;
        if !self.has_weapon {
            return Err(RuleError::MissingEquipment {
                player: self.name.clone(),
                item: "weapon",
            });
        }
        self.check_colocated(target)
    }

    pub fn check_attack_mount(&self, target: &Player) -> Result<(), RuleError> {
        self.check_target(target)?;
        if !self.has_mount {
            return Err(RuleError::MissingEquipment {
                player: self.name.clone(),
                item: "mount",
            });
        }
        self.check_colocated(target)?;
        if self.place.is_hub() {
            return Err(RuleError::MountInHub);
        }
        Ok(())
    }

    fn check_colocated(&self, target: &Player) -> Result<(), RuleError> {
        if self.place == target.place {
            Ok(())
        } else {
            Err(RuleError::OutOfReach {
                actor: self.name.clone(),
                target: target.name.clone(),
            })
        }
    }

    pub fn check_move(&self, place: Place) -> Result<(), RuleError> {
        self.check_alive()?;
        if !self.place.is_adjacent(place) {
            return Err(RuleError::NotAdjacent {
                from: self.place,
                to: place,
            });
        }
        Ok(())
    }

    /// Pull: the mover stands next to the target and drags them onto the
    /// mover's own place. Push: both share a place and the target is shoved
    /// to any place adjacent to it.
    pub fn check_force_move(
        &self,
        target: &Player,
        place: Place,
        config: &RuleConfig,
    ) -> Result<(), RuleError> {
        if !config.force_move_enabled {
            return Err(RuleError::ForceMoveDisabled);
        }
        self.check_target(target)?;
        if !target.place.is_adjacent(place) {
            return Err(RuleError::NotAdjacent {
                from: target.place,
                to: place,
            });
        }
        let pull = self.place.is_adjacent(target.place) && place == self.place;
        let push = self.place == target.place;
        if pull || push {
            Ok(())
        } else {
            Err(RuleError::OutOfReach {
                actor: self.name.clone(),
                target: target.name.clone(),
            })
        }
    }

    pub fn check_upgrade(&self, kind: UpgradeKind, config: &RuleConfig) -> Result<(), RuleError> {
        if self.stat(kind) >= Self::ceiling(kind, config) {
            return Err(RuleError::AtCeiling {
                player: self.name.clone(),
                kind,
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutations (callers run the matching check first)
    // -------------------------------------------------------------------------

    pub(crate) fn buy_weapon(&mut self) {
        self.has_weapon = true;
    }

    pub(crate) fn buy_mount(&mut self) {
        self.has_mount = true;
    }

    pub(crate) fn relocate(&mut self, to: Place) -> crate::Relocation {
        let from = std::mem::replace(&mut self.place, to);
        crate::Relocation {
            player: self.name.clone(),
            from,
            to,
        }
    }

    /// Deals `amount` damage credited to `dealer`.
    pub(crate) fn take_damage(&mut self, amount: i32, dealer: &str) -> Hit {
        let was_alive = self.is_alive();
        self.hp -= amount;
        Hit {
            victim: self.name.clone(),
            dealer: dealer.to_string(),
            amount,
            hp_after: self.hp,
            killed: was_alive && !self.is_alive(),
        }
    }

    pub(crate) fn grant_point(&mut self) {
        self.upgrade_points += 1;
    }

    pub(crate) fn upgrade(&mut self, kind: UpgradeKind) {
        match kind {
            UpgradeKind::Weapon => self.melee_damage += 1,
            UpgradeKind::Mount => self.mount_damage += 1,
            UpgradeKind::MaxHp => self.max_hp += 1,
        }
    }

    pub(crate) fn clear_points(&mut self) {
        self.upgrade_points = 0;
    }

    /// Top-of-round reset: full HP, no equipment, back home, no points.
    pub(crate) fn reset_for_round(&mut self) {
        self.hp = self.max_hp;
        self.has_weapon = false;
        self.has_mount = false;
        self.place = self.home();
        self.upgrade_points = 0;
    }

    fn stat(&self, kind: UpgradeKind) -> i32 {
        match kind {
            UpgradeKind::Weapon => self.melee_damage,
            UpgradeKind::Mount => self.mount_damage,
            UpgradeKind::MaxHp => self.max_hp,
        }
    }

    fn ceiling(kind: UpgradeKind, config: &RuleConfig) -> i32 {
        match kind {
            UpgradeKind::Weapon => config.melee_damage_ceiling,
            UpgradeKind::Mount => config.mount_damage_ceiling,
            UpgradeKind::MaxHp => config.max_hp_ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, seat: u8) -> Player {
        Player::new(name.to_string(), seat, &RuleConfig::default())
    }

    #[test]
    fn test_new_starts_home_with_full_hp() {
        let p = player("alice", 3);
        assert_eq!(p.place(), Place::City(3));
        assert_eq!(p.hp(), p.max_hp());
        assert!(p.is_alive());
        assert!(!p.has_weapon());
    }

    #[test]
    fn test_is_alive_zero_hp_depends_on_config() {
        let mut p = player("alice", 1);
        p.hp = 0;
        assert!(!p.is_alive());
        p.zero_hp_is_alive = true;
        assert!(p.is_alive());
        p.hp = -1;
        assert!(!p.is_alive());
    }

    #[test]
    fn test_check_buy_weapon_away_from_home_fails() {
        let config = RuleConfig::default();
        let mut p = player("alice", 1);
        p.place = Place::Country;
        assert!(matches!(
            p.check_buy_weapon(&config),
            Err(RuleError::NotHome { .. })
        ));

        let anywhere = RuleConfig {
            buy_in_home_city_only: false,
            ..config
        };
        assert!(p.check_buy_weapon(&anywhere).is_ok());
    }

    #[test]
    fn test_check_buy_mount_twice_fails() {
        let config = RuleConfig::default();
        let mut p = player("alice", 1);
        assert!(p.check_buy_mount(&config).is_ok());
        p.buy_mount();
        assert!(matches!(
            p.check_buy_mount(&config),
            Err(RuleError::AlreadyOwned { item: "mount", .. })
        ));
    }

    #[test]
    fn test_check_attack_melee_requirements() {
        let mut a = player("a", 1);
        let mut b = player("b", 2);
        assert!(matches!(
            a.check_attack_melee(&b),
            Err(RuleError::MissingEquipment { .. })
        ));
        a.buy_weapon();
        assert!(matches!(
            a.check_attack_melee(&b),
            Err(RuleError::OutOfReach { .. })
        ));
        b.place = Place::City(1);
        assert!(a.check_attack_melee(&b).is_ok());
        assert!(matches!(
            a.check_attack_melee(&a.clone()),
            Err(RuleError::SelfTarget(_))
        ));
        b.hp = 0;
        assert!(matches!(
            a.check_attack_melee(&b),
            Err(RuleError::TargetDead(_))
        ));
    }

    #[test]
    fn test_check_attack_mount_in_hub_fails() {
        let mut a = player("a", 1);
        let mut b = player("b", 2);
        a.buy_mount();
        a.place = Place::Country;
        b.place = Place::Country;
        assert_eq!(a.check_attack_mount(&b), Err(RuleError::MountInHub));
        a.place = Place::City(2);
        b.place = Place::City(2);
        assert!(a.check_attack_mount(&b).is_ok());
    }

    #[test]
    fn test_check_move_only_adjacent() {
        let p = player("a", 1);
        assert!(p.check_move(Place::Country).is_ok());
        assert!(p.check_move(Place::City(2)).is_err());
        assert!(p.check_move(Place::City(1)).is_err());
    }

    #[test]
    fn test_check_force_move_push_and_pull() {
        let config = RuleConfig::default();
        let mut a = player("a", 1);
        let mut b = player("b", 2);

        // Push: both in City-1, shove b to the hub.
        b.place = Place::City(1);
        assert!(a.check_force_move(&b, Place::Country, &config).is_ok());
        // Cannot shove into a non-adjacent city.
        assert!(a.check_force_move(&b, Place::City(2), &config).is_err());

        // Pull: a in the hub, b in City-2, drag b into the hub.
        a.place = Place::Country;
        b.place = Place::City(2);
        assert!(a.check_force_move(&b, Place::Country, &config).is_ok());

        // Out of reach: a in City-1, b in City-2.
        a.place = Place::City(1);
        assert!(matches!(
            a.check_force_move(&b, Place::Country, &config),
            Err(RuleError::OutOfReach { .. })
        ));
    }

    #[test]
    fn test_check_force_move_disabled_fails() {
        let config = RuleConfig {
            force_move_enabled: false,
            ..Default::default()
        };
        let a = player("a", 1);
        let mut b = player("b", 2);
        b.place = Place::City(1);
        assert_eq!(
            a.check_force_move(&b, Place::Country, &config),
            Err(RuleError::ForceMoveDisabled)
        );
    }

    #[test]
    fn test_take_damage_reports_kill_once() {
        let mut p = player("a", 1);
        p.hp = 2;
        let first = p.take_damage(2, "b");
        assert!(first.killed);
        assert_eq!(first.hp_after, 0);
        let second = p.take_damage(1, "c");
        assert!(!second.killed);
    }

    #[test]
    fn test_check_upgrade_at_ceiling_fails() {
        let config = RuleConfig::default();
        let mut p = player("a", 1);
        while p.check_upgrade(UpgradeKind::Mount, &config).is_ok() {
            p.upgrade(UpgradeKind::Mount);
        }
        assert_eq!(p.mount_damage(), config.mount_damage_ceiling);
        assert!(matches!(
            p.check_upgrade(UpgradeKind::Mount, &config),
            Err(RuleError::AtCeiling {
                kind: UpgradeKind::Mount,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_for_round_restores_start_of_round_state() {
        let mut p = player("a", 2);
        p.buy_weapon();
        p.relocate(Place::Country);
        p.take_damage(3, "b");
        p.grant_point();
        p.upgrade(UpgradeKind::MaxHp);

        p.reset_for_round();
        assert_eq!(p.hp(), p.max_hp());
        assert_eq!(p.max_hp(), RuleConfig::default().start_hp + 1);
        assert!(!p.has_weapon());
        assert_eq!(p.place(), Place::City(2));
        assert_eq!(p.upgrade_points(), 0);
    }
}
