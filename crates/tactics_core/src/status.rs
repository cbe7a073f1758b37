//! Status conditions and the stat penalties they impose.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::stats::Stat;

/// A lasting status affliction. A combatant holds at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCondition {
    /// Slows the combatant: initiative penalty.
    Paralysis,
    /// Weakens physical blows: attack penalty.
    Burn,
    /// Numbs spellcasting: special attack penalty.
    Frostbite,
}

impl StatusCondition {
    /// Stat this condition penalises.
    #[must_use]
    pub const fn penalized_stat(self) -> Stat {
        match self {
            Self::Paralysis => Stat::Initiative,
            Self::Burn => Stat::Attack,
            Self::Frostbite => Stat::SpecialAttack,
        }
    }
}

impl fmt::Display for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Paralysis => "paralysis",
            Self::Burn => "burn",
            Self::Frostbite => "frostbite",
        };
        f.write_str(name)
    }
}

/// Current status of every afflicted combatant.
#[derive(Debug, Clone, Default)]
pub struct StatusBook {
    conditions: BTreeMap<CombatantId, StatusCondition>,
}

impl StatusBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a combatant's status, returning the previous one.
    pub fn set(
        &mut self,
        id: CombatantId,
        condition: Option<StatusCondition>,
    ) -> Option<StatusCondition> {
        match condition {
            Some(condition) => self.conditions.insert(id, condition),
            None => self.conditions.remove(&id),
        }
    }

    /// Current status of a combatant.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<StatusCondition> {
        self.conditions.get(&id).copied()
    }

    /// Whether the combatant's status penalises `stat`.
    #[must_use]
    pub fn penalizes(&self, id: CombatantId, stat: Stat) -> bool {
        self.get(id).is_some_and(|c| c.penalized_stat() == stat)
    }

    /// Drop a combatant's status.
    pub fn purge(&mut self, id: CombatantId) {
        self.conditions.remove(&id);
    }

    /// Drop every status.
    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    /// Afflicted combatants in id order.
    pub fn iter(&self) -> impl Iterator<Item = (CombatantId, StatusCondition)> + '_ {
        self.conditions.iter().map(|(&id, &c)| (id, c))
    }
}
