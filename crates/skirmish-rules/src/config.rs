//! Rule configuration: damage values, ceilings, and feature toggles.

use serde::{Deserialize, Serialize};

use crate::{MAX_SEATS, RuleError};

/// How the self-inflicted melee punishment `max_hp / modifier` is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunishRounding {
    /// Truncate toward zero.
    #[default]
    RoundDown,
    /// Round to nearest, halves go up.
    RoundHalfUp,
    /// Round any remainder up.
    Ceiling,
    /// Floor plus one, unless the division is exact.
    FloorPlusOne,
}

impl PunishRounding {
    /// Computes the punishment for an attacker with `max_hp` hit points.
    ///
    /// `modifier` must be positive; [`RuleConfig::validate`] enforces it.
    pub fn apply(self, max_hp: i32, modifier: i32) -> i32 {
        let quotient = max_hp / modifier;
        let remainder = max_hp % modifier;
        match self {
            Self::RoundDown => quotient,
            Self::RoundHalfUp if remainder * 2 >= modifier => quotient + 1,
            Self::RoundHalfUp => quotient,
            Self::Ceiling | Self::FloorPlusOne if remainder != 0 => quotient + 1,
            Self::Ceiling | Self::FloorPlusOne => quotient,
        }
    }
}

/// Rules applied to every player of one room.
///
/// Starting values double as the round-reset values; ceilings bound the
/// upgrades bought between rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Seats per room (2..=9).
    pub player_count: usize,
    /// Starting hit points and starting max hit points.
    pub start_hp: i32,
    pub max_hp_ceiling: i32,
    pub melee_damage: i32,
    pub melee_damage_ceiling: i32,
    pub mount_damage: i32,
    pub mount_damage_ceiling: i32,
    /// Divisor for the punishment a melee attacker takes in a city.
    pub punish_modifier: i32,
    pub punish_rounding: PunishRounding,
    /// When set, a player at exactly 0 HP is still alive.
    pub zero_hp_is_alive: bool,
    pub force_move_enabled: bool,
    /// Restrict purchases to the buyer's home city.
    pub buy_in_home_city_only: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            player_count: 4,
            start_hp: 10,
            max_hp_ceiling: 15,
            melee_damage: 2,
            melee_damage_ceiling: 5,
            mount_damage: 1,
            mount_damage_ceiling: 3,
            punish_modifier: 3,
            punish_rounding: PunishRounding::RoundDown,
            zero_hp_is_alive: false,
            force_move_enabled: true,
            buy_in_home_city_only: true,
        }
    }
}

impl RuleConfig {
    /// Checks that the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), RuleError> {
        let invalid = |msg: String| Err(RuleError::InvalidConfig(msg));

        if !(2..=MAX_SEATS as usize).contains(&self.player_count) {
            return invalid(format!(
                "player_count must be between 2 and {MAX_SEATS}, got {}",
                self.player_count
            ));
        }
        if self.punish_modifier <= 0 {
            return invalid("punish_modifier must be positive".to_string());
        }
        let stats = [
            ("hp", self.start_hp, self.max_hp_ceiling),
            ("melee damage", self.melee_damage, self.melee_damage_ceiling),
            ("mount damage", self.mount_damage, self.mount_damage_ceiling),
        ];
        for (stat, start, ceiling) in stats {
            if start <= 0 {
                return invalid(format!("starting {stat} must be positive"));
            }
            if ceiling < start {
                return invalid(format!(
                    "{stat} ceiling {ceiling} is below its starting value {start}"
                ));
            }
        }
        Ok(())
    }
}
