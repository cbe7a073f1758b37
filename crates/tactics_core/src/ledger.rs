//! Direct modifier ledger for stats without stages.
//!
//! Accuracy, action points and movement take unbounded additive modifiers.
//! Every applied amount is kept in a history so effects can be audited and
//! attributed. A decrease that would cross the stat's floor is clamped to the
//! floor and still succeeds; the stage path refuses instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combatant::{CombatantId, SourceRelation};
use crate::stats::Stat;

/// One applied direct modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Amount that took effect (after floor clamping).
    pub amount: i32,
    /// How the originator relates to the target.
    pub source_kind: SourceRelation,
    /// Originating combatant, if any.
    pub source_id: Option<CombatantId>,
    /// Logical engine clock at application time.
    pub timestamp: u64,
}

/// Running total and history for one stat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLedger {
    /// Sum of all applied amounts.
    pub total: i32,
    /// Applied entries, oldest first.
    pub history: Vec<LedgerEntry>,
}

/// Outcome of a direct modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectStep {
    /// Value before the change.
    pub old_value: i32,
    /// Value after the change.
    pub new_value: i32,
    /// Whether the floor cut the requested change short.
    pub clamped: bool,
}

impl DirectStep {
    /// Change that actually took effect.
    #[must_use]
    pub fn applied(self) -> i32 {
        self.new_value.saturating_sub(self.old_value)
    }
}

/// Direct modifiers of every combatant.
#[derive(Debug, Clone, Default)]
pub struct DirectModLedger {
    ledgers: BTreeMap<CombatantId, BTreeMap<Stat, StatLedger>>,
}

impl DirectModLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `entry.amount` to a stat, clamping decreases at `floor`.
    ///
    /// The recorded history entry carries the amount that took effect.
    pub fn apply(
        &mut self,
        id: CombatantId,
        stat: Stat,
        baseline: i32,
        floor: i32,
        entry: LedgerEntry,
    ) -> DirectStep {
        let ledger = self.ledgers.entry(id).or_default().entry(stat).or_default();
        let old_value = baseline.saturating_add(ledger.total);
        let candidate = old_value.saturating_add(entry.amount);

        // Never raise a value on a decrease, even if it already sits below the floor.
        let new_value = if entry.amount < 0 {
            candidate.max(floor.min(old_value))
        } else {
            candidate
        };
        let applied = new_value.saturating_sub(old_value);

        ledger.total = ledger.total.saturating_add(applied);
        ledger.history.push(LedgerEntry {
            amount: applied,
            ..entry
        });

        DirectStep {
            old_value,
            new_value,
            clamped: applied != entry.amount,
        }
    }

    /// Accumulated modifier for a stat.
    #[must_use]
    pub fn total(&self, id: CombatantId, stat: Stat) -> i32 {
        self.ledgers
            .get(&id)
            .and_then(|stats| stats.get(&stat))
            .map_or(0, |ledger| ledger.total)
    }

    /// Ledger of one stat, if anything was ever applied.
    #[must_use]
    pub fn get(&self, id: CombatantId, stat: Stat) -> Option<&StatLedger> {
        self.ledgers.get(&id).and_then(|stats| stats.get(&stat))
    }

    /// History of one stat, oldest first.
    #[must_use]
    pub fn history(&self, id: CombatantId, stat: Stat) -> &[LedgerEntry] {
        self.get(id, stat)
            .map(|ledger| ledger.history.as_slice())
            .unwrap_or(&[])
    }

    /// Drop a combatant's modifiers when it leaves.
    pub fn purge(&mut self, id: CombatantId) {
        self.ledgers.remove(&id);
    }

    /// Drop every modifier.
    pub fn clear(&mut self) {
        self.ledgers.clear();
    }
}
