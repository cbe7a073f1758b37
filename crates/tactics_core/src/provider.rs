//! The boundary between the engine and the turn-order collaborator.
//!
//! The engine owns every modifier registry. The collaborator owns the
//! authoritative turn queue of the wider game and only ever receives derived
//! initiative values. Batch submission is the only call whose return value
//! the engine trusts for bookkeeping.

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::engine::StatChange;

/// Why an initiative value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateReason {
    /// A stage or direct modifier changed.
    StageChange,
    /// A status condition was applied or cured.
    StatusChange,
    /// A weather-ability boost was applied.
    WeatherBoost,
    /// A weather-ability boost was removed.
    WeatherRestore,
    /// Modifiers were reset.
    Reset,
    /// The combatant is leaving the battle.
    Removal,
}

/// New initiative value for one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeUpdate {
    /// Target combatant.
    pub id: CombatantId,
    /// Fully composed initiative to publish.
    pub new_value: i32,
    /// Which layer caused the update.
    pub reason: UpdateReason,
}

impl InitiativeUpdate {
    /// Create an update.
    #[must_use]
    pub const fn new(id: CombatantId, new_value: i32, reason: UpdateReason) -> Self {
        Self {
            id,
            new_value,
            reason,
        }
    }
}

/// Per-item outcome of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Combatant the update targeted.
    pub id: CombatantId,
    /// Whether the collaborator applied it.
    pub success: bool,
}

/// External turn-order collaborator.
///
/// Implementations may suspend internally (network, UI, storage). The engine
/// never assumes a single update went through; only the per-item results of
/// [`apply_initiative_updates_batch`](Self::apply_initiative_updates_batch)
/// drive bookkeeping.
pub trait TurnOrderProvider {
    /// Publish one combatant's initiative.
    fn apply_initiative_update(&mut self, update: &InitiativeUpdate);

    /// Publish several initiatives at once and report each item's outcome.
    fn apply_initiative_updates_batch(&mut self, updates: &[InitiativeUpdate])
        -> Vec<UpdateResult>;

    /// Ask the driver to let `id` act immediately, out of normal order.
    fn trigger_immediate_turn(&mut self, id: CombatantId);

    /// Human-readable battle log line. Purely cosmetic.
    fn log_event(&mut self, _text: &str) {}

    /// Persistence sink for successful stat changes.
    fn persist_stat_change(&mut self, _change: &StatChange) {}
}

/// Provider that accepts everything and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

impl TurnOrderProvider for NullProvider {
    fn apply_initiative_update(&mut self, _update: &InitiativeUpdate) {}

    fn apply_initiative_updates_batch(
        &mut self,
        updates: &[InitiativeUpdate],
    ) -> Vec<UpdateResult> {
        updates
            .iter()
            .map(|u| UpdateResult {
                id: u.id,
                success: true,
            })
            .collect()
    }

    fn trigger_immediate_turn(&mut self, _id: CombatantId) {}
}
