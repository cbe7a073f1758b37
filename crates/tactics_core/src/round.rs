//! Per-round action bookkeeping.
//!
//! [`TurnCounter`] tracks how many actions each combatant has consumed this
//! round. [`RoundQueue`] holds the turn order snapshotted when the round
//! began; later initiative changes never reorder it, except for immediate
//! turns pushed to the front.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;

/// Per-round action state of one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    /// No action taken this round.
    NotActed,
    /// One action taken.
    ActedOnce,
    /// Both actions of a double turn taken. Terminal.
    ActedTwice,
}

impl TurnPhase {
    /// Phase for a raw action count.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::NotActed,
            1 => Self::ActedOnce,
            _ => Self::ActedTwice,
        }
    }
}

/// Most actions a combatant can take in one round.
pub const MAX_TURNS_PER_ROUND: u8 = 2;

/// Actions consumed per combatant this round.
#[derive(Debug, Clone, Default)]
pub struct TurnCounter {
    counts: BTreeMap<CombatantId, u8>,
}

impl TurnCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one action and return the new count (saturating at 2).
    pub fn mark_turn_taken(&mut self, id: CombatantId) -> u8 {
        let count = self.counts.entry(id).or_insert(0);
        *count = (*count + 1).min(MAX_TURNS_PER_ROUND);
        *count
    }

    /// Actions taken by `id` this round.
    #[must_use]
    pub fn count(&self, id: CombatantId) -> u8 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Current phase of `id`.
    #[must_use]
    pub fn phase(&self, id: CombatantId) -> TurnPhase {
        TurnPhase::from_count(self.count(id))
    }

    /// Ensure `id` has an entry, starting at 0 if unseen.
    pub fn seed(&mut self, id: CombatantId) {
        self.counts.entry(id).or_insert(0);
    }

    /// Zero every count, keeping the entries.
    pub fn reset_round(&mut self) {
        for count in self.counts.values_mut() {
            *count = 0;
        }
    }

    /// Drop a combatant's entry.
    pub fn purge(&mut self, id: CombatantId) {
        self.counts.remove(&id);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// Why a combatant holds a place in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    /// Regular action from the round snapshot.
    Regular,
    /// Second action of a double turn, queued at the back.
    Bonus,
    /// Second action granted mid-round, queued at the front.
    Immediate,
}

/// One entry of the turn queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnSlot {
    /// Acting combatant.
    pub id: CombatantId,
    /// Why it acts.
    pub kind: SlotKind,
}

/// Turn order of the current round.
#[derive(Debug, Clone, Default)]
pub struct RoundQueue {
    round: u32,
    queue: VecDeque<TurnSlot>,
    in_progress: bool,
}

impl RoundQueue {
    /// Create an idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new round from `(id, initiative)` pairs.
    ///
    /// Order is descending initiative, ties broken by ascending id.
    pub fn begin(&mut self, mut order: Vec<(CombatantId, i32)>) -> u32 {
        order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        self.round += 1;
        self.queue = order
            .into_iter()
            .map(|(id, _)| TurnSlot {
                id,
                kind: SlotKind::Regular,
            })
            .collect();
        self.in_progress = true;
        self.round
    }

    /// Take the next slot. Marks the round finished when empty.
    pub fn pop(&mut self) -> Option<TurnSlot> {
        let slot = self.queue.pop_front();
        if slot.is_none() {
            self.in_progress = false;
        }
        slot
    }

    /// Queue a bonus action at the back.
    pub fn push_bonus(&mut self, id: CombatantId) {
        self.queue.push_back(TurnSlot {
            id,
            kind: SlotKind::Bonus,
        });
    }

    /// Queue an immediate action at the front.
    pub fn push_immediate(&mut self, id: CombatantId) {
        self.queue.push_front(TurnSlot {
            id,
            kind: SlotKind::Immediate,
        });
    }

    /// Drop every pending slot of `id`.
    pub fn remove(&mut self, id: CombatantId) {
        self.queue.retain(|slot| slot.id != id);
    }

    /// Whether a round has begun and not run out of slots.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Number of the current (or last) round, starting at 1.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Pending slots in order.
    pub fn pending(&self) -> impl Iterator<Item = &TurnSlot> {
        self.queue.iter()
    }

    /// Return to the idle state (battle end).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.in_progress = false;
        self.round = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> CombatantId {
        CombatantId::new(raw)
    }

    #[test]
    fn test_counter_state_machine() {
        let mut counter = TurnCounter::new();
        assert_eq!(counter.phase(id(1)), TurnPhase::NotActed);
        assert_eq!(counter.mark_turn_taken(id(1)), 1);
        assert_eq!(counter.phase(id(1)), TurnPhase::ActedOnce);
        assert_eq!(counter.mark_turn_taken(id(1)), 2);
        assert_eq!(counter.mark_turn_taken(id(1)), 2);
        assert_eq!(counter.phase(id(1)), TurnPhase::ActedTwice);
    }

    #[test]
    fn test_reset_round_keeps_entries() {
        let mut counter = TurnCounter::new();
        counter.mark_turn_taken(id(1));
        counter.seed(id(2));
        counter.reset_round();
        assert_eq!(counter.count(id(1)), 0);
        assert_eq!(counter.count(id(2)), 0);
        assert_eq!(counter.phase(id(1)), TurnPhase::NotActed);
        assert_eq!(counter.mark_turn_taken(id(1)), 1);
    }

    #[test]
    fn test_seed_does_not_reset() {
        let mut counter = TurnCounter::new();
        counter.mark_turn_taken(id(1));
        counter.seed(id(1));
        assert_eq!(counter.count(id(1)), 1);
    }

    #[test]
    fn test_snapshot_order() {
        let mut queue = RoundQueue::new();
        let round = queue.begin(vec![(id(3), 10), (id(1), 20), (id(2), 10)]);
        assert_eq!(round, 1);
        let order: Vec<_> = queue.pending().map(|s| s.id.get()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_immediate_goes_first_bonus_goes_last() {
        let mut queue = RoundQueue::new();
        queue.begin(vec![(id(1), 20), (id(2), 10)]);
        queue.push_bonus(id(1));
        queue.push_immediate(id(2));
        let slots: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(slots[0].kind, SlotKind::Immediate);
        assert_eq!(slots[3].kind, SlotKind::Bonus);
        assert!(!queue.in_progress());
    }
}
