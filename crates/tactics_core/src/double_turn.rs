//! Double-turn qualification.
//!
//! A combatant earns a bonus action when its effective initiative exceeds
//! `ratio ×` the fastest living opponent's. The comparison is made on the
//! whole quotient `initiative / ratio`, so against a fastest opponent of 5 an
//! initiative of 11 does not qualify and 12 does. The qualification set is
//! always rebuilt from scratch; nothing else writes it.

use std::collections::{BTreeMap, BTreeSet};

use crate::combatant::{CombatantId, TeamId};

/// Snapshot of one living combatant for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender {
    /// Combatant id.
    pub id: CombatantId,
    /// Owning team.
    pub team: TeamId,
    /// Fully composed initiative.
    pub initiative: i32,
}

/// Changes produced by one recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualificationDiff {
    /// Newly qualifying combatants.
    pub gained: Vec<CombatantId>,
    /// Combatants that no longer qualify.
    pub lost: Vec<CombatantId>,
}

impl QualificationDiff {
    /// Whether the set changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.lost.is_empty()
    }
}

/// Holds the current double-turn set.
#[derive(Debug, Clone)]
pub struct DoubleTurnEvaluator {
    ratio: u32,
    qualified: BTreeSet<CombatantId>,
}

impl DoubleTurnEvaluator {
    /// Create an evaluator with the given threshold ratio.
    #[must_use]
    pub fn new(ratio: u32) -> Self {
        Self {
            ratio,
            qualified: BTreeSet::new(),
        }
    }

    /// Rebuild the qualification set from living combatants.
    pub fn recompute(&mut self, contenders: &[Contender]) -> QualificationDiff {
        // Fastest living member per team; opponents are every other team.
        let mut fastest_by_team: BTreeMap<TeamId, i32> = BTreeMap::new();
        for c in contenders {
            let best = fastest_by_team.entry(c.team).or_insert(i32::MIN);
            *best = (*best).max(c.initiative);
        }

        let next: BTreeSet<CombatantId> = contenders
            .iter()
            .filter(|c| {
                let fastest_opponent = fastest_by_team
                    .iter()
                    .filter(|(&team, _)| team != c.team)
                    .map(|(_, &init)| init)
                    .max()
                    .unwrap_or(0);
                qualifies(c.initiative, fastest_opponent, self.ratio)
            })
            .map(|c| c.id)
            .collect();

        let diff = QualificationDiff {
            gained: next.difference(&self.qualified).copied().collect(),
            lost: self.qualified.difference(&next).copied().collect(),
        };
        self.qualified = next;

        for id in &diff.gained {
            tracing::info!(combatant = %id, "Gained double turn");
        }
        for id in &diff.lost {
            tracing::info!(combatant = %id, "Lost double turn");
        }
        diff
    }

    /// Whether `id` currently qualifies.
    #[must_use]
    pub fn has_double_turns(&self, id: CombatantId) -> bool {
        self.qualified.contains(&id)
    }

    /// Current qualification set in id order.
    pub fn qualified(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.qualified.iter().copied()
    }

    /// Drop a combatant from the set outside of a recompute (leave hook).
    pub(crate) fn forget(&mut self, id: CombatantId) {
        self.qualified.remove(&id);
    }

    /// Empty the set (battle end).
    pub fn clear(&mut self) {
        self.qualified.clear();
    }
}

/// `fastest_opponent > 0 && ⌊initiative / ratio⌋ > fastest_opponent`.
#[must_use]
pub fn qualifies(initiative: i32, fastest_opponent: i32, ratio: u32) -> bool {
    let quotient = i64::from(initiative).div_euclid(i64::from(ratio.max(1)));
    fastest_opponent > 0 && quotient > i64::from(fastest_opponent)
}
