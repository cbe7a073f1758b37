//! Engine rule configuration.
//!
//! All tunables are plain data designed to be deserialized from RON. This
//! module contains no IO; file loading is handled by `tactics_headless`.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Percent;
use crate::stats::Stat;
use crate::weather::WeatherAbility;

/// Lowest reachable stage.
pub const MIN_STAGE: i8 = -6;

/// Highest reachable stage.
pub const MAX_STAGE: i8 = 6;

/// Stage multipliers in percent, indexed by `stage + 6`.
///
/// The negative half is kept literally as observed (`.25 .28 .33 .4 .5 .67`)
/// rather than derived from a formula.
pub const STAGE_TABLE: [Percent; 13] = [
    25, 28, 33, 40, 50, 67, 100, 150, 200, 250, 300, 350, 400,
];

/// Tunable rules for one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stage multiplier table in percent, index 0 is stage -6.
    pub stage_table: [Percent; 13],
    /// Weather-ability initiative multiplier in percent.
    pub weather_boost_percent: Percent,
    /// A combatant needs more than `ratio ×` the fastest opponent's initiative
    /// for a double turn.
    pub double_turn_ratio: u32,
    /// Absolute floor for accuracy.
    pub accuracy_floor: i32,
    /// Absolute floor for action points.
    pub action_points_floor: i32,
    /// Absolute floor for movement.
    pub movement_floor: i32,
    /// Floor for other directly modified stats, as a percent of baseline.
    pub relative_floor_percent: Percent,
    /// Multiplier applied by a status penalty, in percent.
    pub status_penalty_percent: Percent,
    /// Weather abilities evaluated on weather transitions.
    pub weather_abilities: Vec<WeatherAbility>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_table: STAGE_TABLE,
            weather_boost_percent: 200,
            double_turn_ratio: 2,
            accuracy_floor: 10,
            action_points_floor: 1,
            movement_floor: 1,
            relative_floor_percent: 25,
            status_penalty_percent: 50,
            weather_abilities: WeatherAbility::ALL.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from RON text. Missing fields keep their defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        Ok(config)
    }

    /// Multiplier for a stage, clamped to the valid stage range.
    #[must_use]
    pub fn stage_percent(&self, stage: i8) -> Percent {
        let index = (stage.clamp(MIN_STAGE, MAX_STAGE) - MIN_STAGE).unsigned_abs();
        self.stage_table[usize::from(index)]
    }

    /// Lowest value a directly modified stat may reach.
    #[must_use]
    pub fn direct_floor(&self, stat: Stat, baseline: i32) -> i32 {
        match stat {
            Stat::Accuracy => self.accuracy_floor,
            Stat::ActionPoints => self.action_points_floor,
            Stat::Movement => self.movement_floor,
            _ => crate::math::percent_of_ceil(baseline, self.relative_floor_percent),
        }
    }

    /// Check the config for values the engine cannot work with.
    ///
    /// Returns a list of human-readable problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.stage_table[6] != 100 {
            problems.push(format!(
                "stage 0 multiplier must be 100%, got {}%",
                self.stage_table[6]
            ));
        }
        if self.stage_table.windows(2).any(|w| w[0] > w[1]) {
            problems.push("stage table must be non-decreasing".to_string());
        }
        if self.double_turn_ratio == 0 {
            problems.push("double turn ratio must be at least 1".to_string());
        }
        if self.weather_boost_percent == 0 {
            problems.push("weather boost must be positive".to_string());
        }
        for (name, floor) in [
            ("accuracy", self.accuracy_floor),
            ("action points", self.action_points_floor),
            ("movement", self.movement_floor),
        ] {
            if floor < 0 {
                problems.push(format!("{name} floor must not be negative"));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_endpoints() {
        let config = EngineConfig::default();
        assert_eq!(config.stage_percent(-6), 25);
        assert_eq!(config.stage_percent(0), 100);
        assert_eq!(config.stage_percent(6), 400);
        assert_eq!(config.stage_percent(-1), 67);
        assert_eq!(config.stage_percent(1), 150);
    }

    #[test]
    fn test_stage_percent_clamps() {
        let config = EngineConfig::default();
        assert_eq!(config.stage_percent(-20), 25);
        assert_eq!(config.stage_percent(20), 400);
    }

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = EngineConfig::from_ron_str("(weather_boost_percent: 150)").unwrap();
        assert_eq!(config.weather_boost_percent, 150);
        assert_eq!(config.stage_table, STAGE_TABLE);
        assert_eq!(config.double_turn_ratio, 2);
    }

    #[test]
    fn test_invalid_ron_is_reported() {
        let err = EngineConfig::from_ron_str("(weather_boost_percent: \"lots\")").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }

    #[test]
    fn test_direct_floors() {
        let config = EngineConfig::default();
        assert_eq!(config.direct_floor(Stat::Accuracy, 100), 10);
        assert_eq!(config.direct_floor(Stat::Movement, 5), 1);
        assert_eq!(config.direct_floor(Stat::Attack, 40), 10);
    }

    #[test]
    fn test_validate_rejects_broken_table() {
        let mut config = EngineConfig::default();
        config.stage_table[6] = 90;
        config.double_turn_ratio = 0;
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
    }
}
