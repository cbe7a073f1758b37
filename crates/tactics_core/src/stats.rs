//! Stat identifiers, baseline stat blocks and the baseline registry.
//!
//! A baseline is a combatant's stat block before any modifier was ever
//! applied. It is captured exactly once per combatant and never overwritten;
//! every modifier layer derives from it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::error::EngineError;

/// A modifiable combatant stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stat {
    /// Hit chance. Direct modifiers only.
    Accuracy,
    /// Actions available per turn. Direct modifiers only.
    ActionPoints,
    /// Tiles per turn. Direct modifiers only.
    Movement,
    /// Physical attack.
    Attack,
    /// Physical defense.
    Defense,
    /// Special attack.
    SpecialAttack,
    /// Special defense.
    SpecialDefense,
    /// Scheduling priority. The canonical turn-order stat.
    Initiative,
}

impl Stat {
    /// Every stat, in declaration order.
    pub const ALL: [Stat; 8] = [
        Stat::Accuracy,
        Stat::ActionPoints,
        Stat::Movement,
        Stat::Attack,
        Stat::Defense,
        Stat::SpecialAttack,
        Stat::SpecialDefense,
        Stat::Initiative,
    ];

    /// Stats that use the bounded stage table.
    pub const STAGED: [Stat; 5] = [
        Stat::Attack,
        Stat::Defense,
        Stat::SpecialAttack,
        Stat::SpecialDefense,
        Stat::Initiative,
    ];

    /// Whether this stat is modified through stages rather than the direct ledger.
    #[must_use]
    pub const fn is_stage_eligible(self) -> bool {
        matches!(
            self,
            Self::Attack
                | Self::Defense
                | Self::SpecialAttack
                | Self::SpecialDefense
                | Self::Initiative
        )
    }

    /// Human-readable name used in log text.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::ActionPoints => "Action Points",
            Self::Movement => "Movement",
            Self::Attack => "Attack",
            Self::Defense => "Defense",
            Self::SpecialAttack => "Special Attack",
            Self::SpecialDefense => "Special Defense",
            Self::Initiative => "Initiative",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Stat {
    type Err = EngineError;

    /// Normalise a stat name. Case, spaces, dashes and underscores are ignored.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        let stat = match key.as_str() {
            "accuracy" | "acc" => Self::Accuracy,
            "actionpoints" | "ap" => Self::ActionPoints,
            "movement" | "move" | "mov" => Self::Movement,
            "attack" | "atk" => Self::Attack,
            "defense" | "defence" | "def" => Self::Defense,
            "specialattack" | "spattack" | "spatk" | "spa" => Self::SpecialAttack,
            "specialdefense" | "specialdefence" | "spdefense" | "spdef" | "spddef" => {
                Self::SpecialDefense
            }
            "initiative" | "init" | "speed" | "spd" | "spe" => Self::Initiative,
            _ => return Err(EngineError::UnknownStat(raw.to_string())),
        };
        Ok(stat)
    }
}

/// A combatant's pristine stat values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaselineStats {
    /// Hit chance.
    pub accuracy: i32,
    /// Actions per turn.
    pub action_points: i32,
    /// Tiles per turn.
    pub movement: i32,
    /// Physical attack.
    pub attack: i32,
    /// Physical defense.
    pub defense: i32,
    /// Special attack.
    pub special_attack: i32,
    /// Special defense.
    pub special_defense: i32,
    /// Scheduling priority.
    pub initiative: i32,
}

impl BaselineStats {
    /// Fallback values substituted for malformed (negative) fields.
    pub const DEFAULT: Self = Self {
        accuracy: 100,
        action_points: 2,
        movement: 3,
        attack: 10,
        defense: 10,
        special_attack: 10,
        special_defense: 10,
        initiative: 10,
    };

    /// Read one stat.
    #[must_use]
    pub const fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Accuracy => self.accuracy,
            Stat::ActionPoints => self.action_points,
            Stat::Movement => self.movement,
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::SpecialAttack => self.special_attack,
            Stat::SpecialDefense => self.special_defense,
            Stat::Initiative => self.initiative,
        }
    }

    /// Builder-style setter, mostly for fixtures.
    #[must_use]
    pub fn with(mut self, stat: Stat, value: i32) -> Self {
        match stat {
            Stat::Accuracy => self.accuracy = value,
            Stat::ActionPoints => self.action_points = value,
            Stat::Movement => self.movement = value,
            Stat::Attack => self.attack = value,
            Stat::Defense => self.defense = value,
            Stat::SpecialAttack => self.special_attack = value,
            Stat::SpecialDefense => self.special_defense = value,
            Stat::Initiative => self.initiative = value,
        }
        self
    }

    /// Replace every negative field with its [`BaselineStats::DEFAULT`] value.
    ///
    /// Returns the sanitised block and the stats that had to be replaced.
    #[must_use]
    pub fn sanitized(self) -> (Self, Vec<Stat>) {
        let mut clean = self;
        let mut replaced = Vec::new();
        for stat in Stat::ALL {
            if self.get(stat) < 0 {
                clean = clean.with(stat, Self::DEFAULT.get(stat));
                replaced.push(stat);
            }
        }
        (clean, replaced)
    }
}

impl Default for BaselineStats {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Write-once store of baseline stats keyed by combatant.
#[derive(Debug, Clone, Default)]
pub struct BaselineRegistry {
    baselines: BTreeMap<CombatantId, BaselineStats>,
}

impl BaselineRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a baseline unless one already exists.
    ///
    /// Returns the stored baseline, which is the previously captured one if
    /// the combatant was already registered.
    pub fn capture(&mut self, id: CombatantId, stats: BaselineStats) -> BaselineStats {
        *self.baselines.entry(id).or_insert_with(|| {
            let (clean, replaced) = stats.sanitized();
            if !replaced.is_empty() {
                tracing::warn!(
                    combatant = %id,
                    ?replaced,
                    "Malformed baseline, substituted defaults"
                );
            }
            tracing::debug!(combatant = %id, initiative = clean.initiative, "Baseline captured");
            clean
        })
    }

    /// Get a captured baseline.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&BaselineStats> {
        self.baselines.get(&id)
    }

    /// Drop a combatant's baseline when it leaves the battle.
    pub fn purge(&mut self, id: CombatantId) -> Option<BaselineStats> {
        self.baselines.remove(&id)
    }

    /// Drop every baseline (battle end).
    pub fn clear(&mut self) {
        self.baselines.clear();
    }
}
