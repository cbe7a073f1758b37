//! A recording turn-order provider for tests.
//!
//! Every call the engine makes is captured so tests can assert on exactly
//! what crossed the boundary. Batch items can be scripted to fail, either
//! once or permanently, to exercise partial-failure handling.

use std::collections::{BTreeMap, BTreeSet};

use tactics_core::engine::StatChange;
use tactics_core::prelude::{CombatantId, InitiativeUpdate, TurnOrderProvider, UpdateResult};

/// Provider that records everything and fails on request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    /// Single updates, in call order.
    pub updates: Vec<InitiativeUpdate>,
    /// Submitted batches, in call order.
    pub batches: Vec<Vec<InitiativeUpdate>>,
    /// Immediate-turn requests, in call order.
    pub immediate_turns: Vec<CombatantId>,
    /// Battle log lines.
    pub events: Vec<String>,
    /// Persisted stat changes.
    pub persisted: Vec<StatChange>,
    /// Last initiative the provider accepted per combatant.
    pub published: BTreeMap<CombatantId, i32>,
    fail_once: BTreeSet<CombatantId>,
    fail_always: BTreeSet<CombatantId>,
}

impl ScriptedProvider {
    /// Create a provider that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next batch item for `id`, then recover.
    #[must_use]
    pub fn failing_once(mut self, id: CombatantId) -> Self {
        self.fail_once.insert(id);
        self
    }

    /// Fail every batch item for `id` until [`recover`](Self::recover).
    pub fn fail_always(&mut self, id: CombatantId) {
        self.fail_always.insert(id);
    }

    /// Schedule a one-off failure for `id`.
    pub fn fail_next(&mut self, id: CombatantId) {
        self.fail_once.insert(id);
    }

    /// Stop failing items for `id`.
    pub fn recover(&mut self, id: CombatantId) {
        self.fail_always.remove(&id);
        self.fail_once.remove(&id);
    }

    /// Last initiative accepted for `id`.
    #[must_use]
    pub fn last_value(&self, id: CombatantId) -> Option<i32> {
        self.published.get(&id).copied()
    }

    /// Every update for `id` that reached the provider, single or batched.
    #[must_use]
    pub fn history_of(&self, id: CombatantId) -> Vec<i32> {
        self.updates
            .iter()
            .chain(self.batches.iter().flatten())
            .filter(|u| u.id == id)
            .map(|u| u.new_value)
            .collect()
    }

    /// Forget everything recorded so far. Scripted failures are kept.
    pub fn clear_log(&mut self) {
        self.updates.clear();
        self.batches.clear();
        self.immediate_turns.clear();
        self.events.clear();
        self.persisted.clear();
    }
}

impl TurnOrderProvider for ScriptedProvider {
    fn apply_initiative_update(&mut self, update: &InitiativeUpdate) {
        self.published.insert(update.id, update.new_value);
        self.updates.push(*update);
    }

    fn apply_initiative_updates_batch(
        &mut self,
        updates: &[InitiativeUpdate],
    ) -> Vec<UpdateResult> {
        self.batches.push(updates.to_vec());
        updates
            .iter()
            .map(|update| {
                let failed =
                    self.fail_always.contains(&update.id) || self.fail_once.remove(&update.id);
                if failed {
                    tracing::trace!(combatant = %update.id, "Scripted batch failure");
                } else {
                    self.published.insert(update.id, update.new_value);
                }
                UpdateResult {
                    id: update.id,
                    success: !failed,
                }
            })
            .collect()
    }

    fn trigger_immediate_turn(&mut self, id: CombatantId) {
        self.immediate_turns.push(id);
    }

    fn log_event(&mut self, text: &str) {
        self.events.push(text.to_string());
    }

    fn persist_stat_change(&mut self, change: &StatChange) {
        self.persisted.push(*change);
    }
}
