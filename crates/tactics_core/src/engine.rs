//! The turn-order engine.
//!
//! [`TurnEngine`] owns every modifier registry as an arena keyed by
//! [`CombatantId`] and talks to the outside world only through its
//! [`TurnOrderProvider`]. Initiative is composed in layers, each rounded:
//!
//! ```text
//! baseline ─► stage multiplier ─► status penalty ─► weather boost
//! ```
//!
//! Any change to a combatant's initiative is pushed to the provider and
//! followed by a full double-turn recomputation.
//!
//! # Determinism
//!
//! - No floating-point math (percent tables composed in fixed-point)
//! - No randomness and no wall clock (a logical clock stamps ledger entries)
//! - Consistent iteration order (ids are kept in ordered maps)
//!
//! # Example
//!
//! ```
//! use tactics_core::prelude::*;
//!
//! let mut engine = TurnEngine::new(EngineConfig::default(), NullProvider);
//! let hero = engine
//!     .join(Combatant::new(CombatantId::new(1), TeamId::new(0)))
//!     .unwrap();
//!
//! let change = engine
//!     .change_stat_value(hero, "speed", 2, ChangeSource::Combatant(hero))
//!     .unwrap();
//! assert_eq!(change.stage, Some(2));
//! assert_eq!(change.new_value, 20);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combatant::{Capability, ChangeSource, Combatant, CombatantId, Roster, SourceRelation};
use crate::config::EngineConfig;
use crate::double_turn::{Contender, DoubleTurnEvaluator, QualificationDiff};
use crate::error::{EngineError, Result};
use crate::ledger::{DirectModLedger, LedgerEntry};
use crate::math::scale_by_percent;
use crate::provider::{InitiativeUpdate, TurnOrderProvider, UpdateReason, UpdateResult};
use crate::round::{RoundQueue, SlotKind, TurnCounter, TurnPhase, TurnSlot};
use crate::stages::{staged_value, StageBoundary, StageBook};
use crate::stats::{BaselineRegistry, BaselineStats, Stat};
use crate::status::{StatusBook, StatusCondition};
use crate::weather::{
    relevant_abilities, BoostBatch, BoostOutcome, BoostTracker, Weather, WeatherAbility,
};

/// Successful result of a stat change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatChange {
    /// Target combatant.
    pub combatant: CombatantId,
    /// Changed stat.
    pub stat: Stat,
    /// Fully composed value before the change.
    pub old_value: i32,
    /// Fully composed value after the change.
    pub new_value: i32,
    /// Stage or ledger delta that took effect after inversion and clamping.
    pub effective_delta: i32,
    /// New stage, for stage-eligible stats.
    pub stage: Option<i8>,
}

/// Combat turn-order engine.
pub struct TurnEngine<P: TurnOrderProvider> {
    config: EngineConfig,
    provider: P,
    roster: Roster,
    baselines: BaselineRegistry,
    stages: StageBook,
    ledger: DirectModLedger,
    statuses: StatusBook,
    boosts: BoostTracker,
    evaluator: DoubleTurnEvaluator,
    counter: TurnCounter,
    queue: RoundQueue,
    weather: Weather,
    clock: u64,
}

impl<P: TurnOrderProvider> TurnEngine<P> {
    /// Create an engine with an empty roster and clear weather.
    #[must_use]
    pub fn new(config: EngineConfig, provider: P) -> Self {
        let evaluator = DoubleTurnEvaluator::new(config.double_turn_ratio);
        Self {
            config,
            provider,
            roster: Roster::new(),
            baselines: BaselineRegistry::new(),
            stages: StageBook::new(),
            ledger: DirectModLedger::new(),
            statuses: StatusBook::new(),
            boosts: BoostTracker::new(),
            evaluator,
            counter: TurnCounter::new(),
            queue: RoundQueue::new(),
            weather: Weather::Clear,
            clock: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Rules in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The turn-order collaborator.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the turn-order collaborator.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Every combatant that joined.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Current weather.
    #[must_use]
    pub fn weather(&self) -> Weather {
        self.weather
    }

    /// Number of the current round (0 before the first).
    #[must_use]
    pub fn round(&self) -> u32 {
        self.queue.round()
    }

    /// Value of the logical clock.
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Add a combatant to the battle.
    pub fn join(&mut self, combatant: Combatant) -> Result<CombatantId> {
        let id = self.roster.join(combatant)?;
        tracing::debug!(combatant = %id, "Combatant joined");
        self.refresh_double_turns();
        Ok(id)
    }

    /// Remove a combatant and every record held for it.
    ///
    /// An active weather boost is restored first; pending boost items for
    /// the combatant are cancelled.
    pub fn leave(&mut self, id: CombatantId) -> Result<Combatant> {
        self.require(id)?;
        if let Some(update) = self.boosts.remove_boost(id, UpdateReason::Removal) {
            self.provider.apply_initiative_update(&update);
        }
        self.boosts.purge(id);
        self.baselines.purge(id);
        self.stages.purge(id);
        self.ledger.purge(id);
        self.statuses.purge(id);
        self.counter.purge(id);
        self.evaluator.forget(id);
        self.queue.remove(id);

        let combatant = self.roster.leave(id).ok_or(EngineError::CombatantNotFound(id))?;
        tracing::info!(combatant = %id, "Combatant left the battle");
        self.provider
            .log_event(&format!("{} left the battle", combatant.name));
        self.refresh_double_turns();
        Ok(combatant)
    }

    /// Flag a combatant as defeated. It keeps its records but no longer
    /// acts or counts as an opponent.
    pub fn mark_defeated(&mut self, id: CombatantId) -> Result<()> {
        let combatant = self
            .roster
            .get_mut(id)
            .ok_or(EngineError::CombatantNotFound(id))?;
        if !combatant.alive {
            return Ok(());
        }
        combatant.alive = false;
        let text = format!("{} was defeated", combatant.name);
        self.queue.remove(id);
        tracing::info!(combatant = %id, "Combatant defeated");
        self.provider.log_event(&text);
        self.refresh_double_turns();
        Ok(())
    }

    // ========================================================================
    // Stat changes
    // ========================================================================

    /// Change a stat given by name. See [`change_stat`](Self::change_stat).
    pub fn change_stat_value(
        &mut self,
        id: CombatantId,
        stat_name: &str,
        delta: i32,
        source: ChangeSource,
    ) -> Result<StatChange> {
        let stat = match stat_name.parse::<Stat>() {
            Ok(stat) => stat,
            Err(err) => return self.refuse(err),
        };
        self.change_stat(id, stat, delta, source)
    }

    /// Apply `delta` to one stat of a combatant.
    ///
    /// Stage-eligible stats move their stage and refuse at the bounds.
    /// Other stats accumulate in the direct ledger and clamp at their floor.
    /// The combatant's capabilities may invert the delta or refuse a
    /// decrease from anyone but itself.
    pub fn change_stat(
        &mut self,
        id: CombatantId,
        stat: Stat,
        delta: i32,
        source: ChangeSource,
    ) -> Result<StatChange> {
        let Some(combatant) = self.roster.get(id) else {
            return self.refuse(EngineError::CombatantNotFound(id));
        };
        let inverts = combatant.has_capability(&[Capability::InvertStatChanges]);
        let immune = combatant.has_capability(&[Capability::StatDropImmunity]);
        let relation = self.roster.relation(id, source);

        let delta = if inverts { delta.saturating_neg() } else { delta };
        if delta < 0 && immune && relation != SourceRelation::SelfInflicted {
            return self.refuse(EngineError::PreventedByAbility {
                combatant: id,
                stat,
                capability: Capability::StatDropImmunity,
            });
        }

        let baseline = self.ensure_baseline(id);
        let old_value = self.composed_value(id, stat);

        if delta == 0 {
            return Ok(StatChange {
                combatant: id,
                stat,
                old_value,
                new_value: old_value,
                effective_delta: 0,
                stage: stat
                    .is_stage_eligible()
                    .then(|| self.stages.stage(id, stat)),
            });
        }

        let (effective_delta, stage) = if stat.is_stage_eligible() {
            match self.stages.entry(id).shift(stat, delta) {
                Ok(step) => {
                    self.clock += 1;
                    (step.applied(), Some(step.new))
                }
                Err(StageBoundary::AtMaximum) => {
                    return self.refuse(EngineError::AtMaximum { combatant: id, stat })
                }
                Err(StageBoundary::AtMinimum) => {
                    return self.refuse(EngineError::AtMinimum { combatant: id, stat })
                }
            }
        } else {
            let base = baseline.get(stat);
            let floor = self.config.direct_floor(stat, base);
            self.clock += 1;
            let step = self.ledger.apply(
                id,
                stat,
                base,
                floor,
                LedgerEntry {
                    amount: delta,
                    source_kind: relation,
                    source_id: match source {
                        ChangeSource::Combatant(source_id) => Some(source_id),
                        ChangeSource::Environment => None,
                    },
                    timestamp: self.clock,
                },
            );
            if step.clamped {
                tracing::debug!(
                    combatant = %id,
                    stat = ?stat,
                    requested = delta,
                    applied = step.applied(),
                    "Direct modifier clamped at floor"
                );
            }
            (step.applied(), None)
        };

        if stat == Stat::Initiative {
            self.on_initiative_changed(id, UpdateReason::StageChange);
        }

        let change = StatChange {
            combatant: id,
            stat,
            old_value,
            new_value: self.composed_value(id, stat),
            effective_delta,
            stage,
        };
        tracing::debug!(
            combatant = %id,
            stat = ?stat,
            old = change.old_value,
            new = change.new_value,
            stage = ?change.stage,
            "Stat changed"
        );
        self.provider.persist_stat_change(&change);
        self.provider.log_event(&describe_change(&change));
        Ok(change)
    }

    /// Set or cure a combatant's status condition. Returns the old one.
    pub fn set_status(
        &mut self,
        id: CombatantId,
        condition: Option<StatusCondition>,
    ) -> Result<Option<StatusCondition>> {
        if !self.roster.contains(id) {
            return self.refuse(EngineError::CombatantNotFound(id));
        }
        self.ensure_baseline(id);
        let previous = self.statuses.set(id, condition);
        if previous == condition {
            return Ok(previous);
        }

        let touches_initiative = [previous, condition]
            .iter()
            .flatten()
            .any(|c| c.penalized_stat() == Stat::Initiative);
        if touches_initiative {
            self.on_initiative_changed(id, UpdateReason::StatusChange);
        }

        tracing::debug!(combatant = %id, from = ?previous, to = ?condition, "Status changed");
        let text = match condition {
            Some(c) => format!("{id} is afflicted with {c}"),
            None => format!("{id} recovered"),
        };
        self.provider.log_event(&text);
        Ok(previous)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Fully composed current value of a stat.
    pub fn current_stat_value(&self, id: CombatantId, stat: Stat) -> Result<i32> {
        self.require(id)?;
        Ok(self.composed_value(id, stat))
    }

    /// Current stage of a stat (0 for stats without stages).
    pub fn current_stage(&self, id: CombatantId, stat: Stat) -> Result<i8> {
        self.require(id)?;
        Ok(self.stages.stage(id, stat))
    }

    /// Fully composed initiative, 0 for unknown combatants.
    #[must_use]
    pub fn effective_initiative(&self, id: CombatantId) -> i32 {
        if self.roster.contains(id) {
            self.composed_value(id, Stat::Initiative)
        } else {
            0
        }
    }

    /// Direct modifier history of a stat, oldest first.
    #[must_use]
    pub fn ledger_history(&self, id: CombatantId, stat: Stat) -> &[LedgerEntry] {
        self.ledger.history(id, stat)
    }

    /// Current status condition.
    #[must_use]
    pub fn status(&self, id: CombatantId) -> Option<StatusCondition> {
        self.statuses.get(id)
    }

    /// Weather ability currently boosting `id`.
    #[must_use]
    pub fn boost_of(&self, id: CombatantId) -> Option<WeatherAbility> {
        self.boosts.boost_of(id)
    }

    /// Initiative captured before `id`'s first weather boost.
    #[must_use]
    pub fn true_original_initiative(&self, id: CombatantId) -> Option<i32> {
        self.boosts.true_original(id)
    }

    /// Captured baseline, if the combatant was ever modified.
    #[must_use]
    pub fn baseline(&self, id: CombatantId) -> Option<&BaselineStats> {
        self.baselines.get(id)
    }

    // ========================================================================
    // Weather
    // ========================================================================

    /// Evaluate every registered weather ability once against the current
    /// weather.
    pub fn start_battle(&mut self) -> Vec<BoostOutcome> {
        tracing::info!(weather = %self.weather, "Battle started");
        let abilities = self.config.weather_abilities.clone();
        let outcomes = abilities
            .into_iter()
            .map(|ability| self.apply_weather_ability_boost(ability))
            .collect();
        self.refresh_double_turns();
        outcomes
    }

    /// Change the weather and evaluate the abilities tied to the old or the
    /// new weather.
    pub fn set_weather(&mut self, weather: Weather) -> Vec<BoostOutcome> {
        let old = std::mem::replace(&mut self.weather, weather);
        if old == weather {
            return Vec::new();
        }
        tracing::info!(from = %old, to = %weather, "Weather changed");
        self.provider
            .log_event(&format!("The weather changed from {old} to {weather}"));

        let outcomes: Vec<BoostOutcome> =
            relevant_abilities(&self.config.weather_abilities, old, weather)
                .into_iter()
                .map(|ability| self.apply_weather_ability_boost(ability))
                .collect();
        if !outcomes.iter().any(BoostOutcome::changed) {
            // Relative speed may still have shifted from other sources.
            self.refresh_double_turns();
        }
        outcomes
    }

    /// Apply or revert one ability's boost in a single provider batch.
    pub fn apply_weather_ability_boost(&mut self, ability: WeatherAbility) -> BoostOutcome {
        let batch = self.stage_weather_boost(ability);
        if batch.is_empty() {
            return BoostOutcome::default();
        }
        let results = self
            .provider
            .apply_initiative_updates_batch(&batch.updates());
        self.complete_weather_boost(&batch, &results)
    }

    /// Stage one ability's boost without submitting it.
    ///
    /// The caller submits [`BoostBatch::updates`] and hands the results to
    /// [`complete_weather_boost`](Self::complete_weather_boost). Several
    /// staged batches may be outstanding at once.
    pub fn stage_weather_boost(&mut self, ability: WeatherAbility) -> BoostBatch {
        let active = ability.is_active_in(self.weather);
        let carriers: Vec<CombatantId> = self
            .roster
            .living()
            .filter(|c| c.has_capability(&[Capability::Weather(ability)]))
            .map(|c| c.id)
            .collect();
        let candidates: Vec<(CombatantId, i32)> = carriers
            .into_iter()
            .map(|id| {
                self.ensure_baseline(id);
                (id, self.pre_weather_initiative(id))
            })
            .collect();
        self.boosts
            .stage_boost(ability, active, candidates, self.config.weather_boost_percent)
    }

    /// Record the provider's results for a staged batch.
    pub fn complete_weather_boost(
        &mut self,
        batch: &BoostBatch,
        results: &[UpdateResult],
    ) -> BoostOutcome {
        let outcome = self.boosts.complete_boost(batch, results);

        for id in &outcome.applied {
            self.provider.log_event(&format!(
                "{}'s {} raised its initiative",
                self.display_name(*id),
                batch.ability
            ));
        }
        for id in &outcome.restored {
            self.provider.log_event(&format!(
                "{}'s {} wore off",
                self.display_name(*id),
                batch.ability
            ));
        }
        self.reconcile_published(batch, results);
        if outcome.changed() {
            self.refresh_double_turns();
        }
        outcome
    }

    /// Correct values the provider accepted from `batch` that no longer
    /// match the composed initiative.
    ///
    /// A stage or status change may land while the batch is in flight, and
    /// a late batch may have been superseded by a newer one. Combatants
    /// still waiting on a newer batch are left to that batch's completion.
    fn reconcile_published(&mut self, batch: &BoostBatch, results: &[UpdateResult]) {
        for item in &batch.items {
            let id = item.update.id;
            let accepted = results.iter().any(|r| r.id == id && r.success);
            if !accepted || !self.roster.contains(id) || self.boosts.is_pending(id) {
                continue;
            }
            let current = self.effective_initiative(id);
            if current == item.update.new_value {
                continue;
            }
            tracing::debug!(
                combatant = %id,
                batch = batch.id.get(),
                published = item.update.new_value,
                current,
                "Correcting initiative published by boost batch"
            );
            let update = InitiativeUpdate::new(id, current, item.update.reason);
            self.provider.apply_initiative_update(&update);
        }
    }

    /// Remove one combatant's weather boost immediately.
    ///
    /// Returns whether a boost was active. A boost still waiting for its
    /// batch to complete is cancelled and the pre-weather value republished,
    /// since the provider may already hold the boosted one.
    pub fn remove_weather_ability_boost(&mut self, id: CombatantId) -> Result<bool> {
        self.require(id)?;
        let pending = self.boosts.is_pending(id);
        let Some(update) = self.boosts.remove_boost(id, UpdateReason::WeatherRestore) else {
            if pending {
                let update = InitiativeUpdate::new(
                    id,
                    self.pre_weather_initiative(id),
                    UpdateReason::WeatherRestore,
                );
                self.provider.apply_initiative_update(&update);
            }
            return Ok(false);
        };
        self.provider.apply_initiative_update(&update);
        self.refresh_double_turns();
        Ok(true)
    }

    // ========================================================================
    // Double turns and rounds
    // ========================================================================

    /// Whether `id` currently qualifies for a second action.
    #[must_use]
    pub fn has_double_turns(&self, id: CombatantId) -> bool {
        self.evaluator.has_double_turns(id)
    }

    /// Whether `id` should take its bonus action now: it qualifies and has
    /// acted exactly once this round.
    #[must_use]
    pub fn should_get_second_turn(&self, id: CombatantId) -> bool {
        self.has_double_turns(id) && self.counter.phase(id) == TurnPhase::ActedOnce
    }

    /// Record an action and return the new count for this round.
    pub fn mark_turn_taken(&mut self, id: CombatantId) -> u8 {
        self.counter.mark_turn_taken(id)
    }

    /// Actions `id` took this round.
    #[must_use]
    pub fn turns_taken(&self, id: CombatantId) -> u8 {
        self.counter.count(id)
    }

    /// Current double-turn set in id order.
    #[must_use]
    pub fn double_turn_set(&self) -> Vec<CombatantId> {
        self.evaluator.qualified().collect()
    }

    /// Zero every action count. Qualification is untouched.
    pub fn reset_round_counters(&mut self) {
        self.counter.reset_round();
    }

    /// Snapshot the turn order for a new round and reset the counters.
    pub fn begin_round(&mut self) -> u32 {
        self.reset_round_counters();
        let order: Vec<(CombatantId, i32)> = self
            .roster
            .living()
            .map(|c| (c.id, self.composed_value(c.id, Stat::Initiative)))
            .collect();
        let round = self.queue.begin(order);
        tracing::info!(round, "Round started");
        self.provider.log_event(&format!("Round {round} begins"));
        round
    }

    /// Next combatant to act, skipping entries that are no longer valid.
    pub fn next_turn(&mut self) -> Option<TurnSlot> {
        while let Some(slot) = self.queue.pop() {
            let valid = self.roster.is_alive(slot.id)
                && match slot.kind {
                    SlotKind::Regular => self.counter.phase(slot.id) == TurnPhase::NotActed,
                    SlotKind::Bonus | SlotKind::Immediate => {
                        self.should_get_second_turn(slot.id)
                    }
                };
            if valid {
                return Some(slot);
            }
            tracing::debug!(
                combatant = %slot.id,
                kind = ?slot.kind,
                "Skipped stale turn slot"
            );
        }
        None
    }

    /// Finish a combatant's action, queueing its bonus action if it earned
    /// one.
    pub fn end_turn(&mut self, id: CombatantId) -> Result<u8> {
        self.require(id)?;
        let count = self.mark_turn_taken(id);
        if self.queue.in_progress() && self.should_get_second_turn(id) {
            self.queue.push_bonus(id);
            tracing::debug!(combatant = %id, "Bonus action queued");
        }
        Ok(count)
    }

    /// Clear modifiers.
    ///
    /// Stages, direct modifiers and statuses are always cleared; weather
    /// boosts survive and are re-composed on the new base. With
    /// `battle_end`, boosts are restored as well and every battle-scoped
    /// record (true originals, baselines, double-turn set, counters, round)
    /// is dropped.
    pub fn reset_all_modifiers(&mut self, battle_end: bool) {
        if battle_end {
            for update in self.boosts.reset_all() {
                self.provider.apply_initiative_update(&update);
            }
            self.boosts.clear_originals();
        }
        self.stages.reset_all();
        self.ledger.clear();
        self.statuses.clear();

        let ids = self.roster.ids();
        for &id in &ids {
            self.boosts
                .rebase_original(id, self.pre_weather_initiative(id));
        }
        let updates: Vec<InitiativeUpdate> = ids
            .iter()
            .map(|&id| {
                InitiativeUpdate::new(id, self.effective_initiative(id), UpdateReason::Reset)
            })
            .collect();
        for update in &updates {
            self.provider.apply_initiative_update(update);
        }

        if battle_end {
            self.baselines.clear();
            self.stages.clear();
            self.evaluator.clear();
            self.counter.clear();
            self.queue.clear();
            tracing::info!("Battle-scoped state cleared");
        } else {
            self.refresh_double_turns();
        }
        tracing::info!(battle_end, "Modifiers reset");
    }

    /// Hash of the complete engine state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.clock.hash(&mut hasher);
        self.queue.round().hash(&mut hasher);
        self.weather.hash(&mut hasher);

        let ids = self.roster.ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            id.hash(&mut hasher);
            self.roster.is_alive(id).hash(&mut hasher);
            for stat in Stat::ALL {
                self.composed_value(id, stat).hash(&mut hasher);
                self.stages.stage(id, stat).hash(&mut hasher);
            }
            self.statuses.get(id).hash(&mut hasher);
            self.boosts.boost_of(id).hash(&mut hasher);
            self.boosts.true_original(id).hash(&mut hasher);
            self.counter.count(id).hash(&mut hasher);
        }

        for id in self.evaluator.qualified() {
            id.hash(&mut hasher);
        }
        for slot in self.queue.pending() {
            slot.hash(&mut hasher);
        }

        hasher.finish()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, id: CombatantId) -> Result<&Combatant> {
        self.roster.require(id)
    }

    /// Log a refusal and hand it back to the caller.
    fn refuse<T>(&mut self, err: EngineError) -> Result<T> {
        tracing::warn!(error = %err, kind = ?err.kind(), "Stat change refused");
        self.provider.log_event(&err.to_string());
        Err(err)
    }

    fn display_name(&self, id: CombatantId) -> String {
        self.roster
            .get(id)
            .map_or_else(|| id.to_string(), |c| c.name.clone())
    }

    /// Capture the baseline on first interaction.
    fn ensure_baseline(&mut self, id: CombatantId) -> BaselineStats {
        match self.roster.get(id) {
            Some(combatant) => self.baselines.capture(id, combatant.base_stats),
            None => BaselineStats::DEFAULT,
        }
    }

    /// Baseline of a combatant, falling back to its stat block when no
    /// modifier has touched it yet.
    fn baseline_of(&self, id: CombatantId) -> BaselineStats {
        if let Some(baseline) = self.baselines.get(id) {
            return *baseline;
        }
        self.roster
            .get(id)
            .map_or(BaselineStats::DEFAULT, |c| c.base_stats.sanitized().0)
    }

    /// Stat value with every layer below the weather boost applied.
    fn layered_value(&self, id: CombatantId, stat: Stat) -> i32 {
        let base = self.baseline_of(id).get(stat);
        let value = if stat.is_stage_eligible() {
            staged_value(&self.config, base, self.stages.stage(id, stat))
        } else {
            base.saturating_add(self.ledger.total(id, stat))
        };
        if self.statuses.penalizes(id, stat) {
            scale_by_percent(value, self.config.status_penalty_percent)
        } else {
            value
        }
    }

    fn pre_weather_initiative(&self, id: CombatantId) -> i32 {
        self.layered_value(id, Stat::Initiative)
    }

    fn composed_value(&self, id: CombatantId, stat: Stat) -> i32 {
        let value = self.layered_value(id, stat);
        if stat != Stat::Initiative || !self.boosts.is_boosted(id) {
            return value;
        }
        let original = self.boosts.true_original(id).unwrap_or(value);
        scale_by_percent(original, self.config.weather_boost_percent)
    }

    /// Push a changed initiative and re-evaluate double turns.
    fn on_initiative_changed(&mut self, id: CombatantId, reason: UpdateReason) {
        self.boosts
            .rebase_original(id, self.pre_weather_initiative(id));
        let update = InitiativeUpdate::new(id, self.effective_initiative(id), reason);
        self.provider.apply_initiative_update(&update);
        self.refresh_double_turns();
    }

    /// Rebuild the double-turn set and grant immediate turns.
    ///
    /// A combatant that newly qualifies mid-round after acting exactly once
    /// would otherwise only get its bonus action at the back of the queue;
    /// it is granted an immediate turn instead.
    fn refresh_double_turns(&mut self) -> QualificationDiff {
        let contenders: Vec<Contender> = self
            .roster
            .living()
            .map(|c| Contender {
                id: c.id,
                team: c.team,
                initiative: self.composed_value(c.id, Stat::Initiative),
            })
            .collect();
        let diff = self.evaluator.recompute(&contenders);

        for &id in &diff.gained {
            self.counter.seed(id);
            self.provider.log_event(&format!(
                "{} is fast enough to act twice",
                self.display_name(id)
            ));
            if self.queue.in_progress() && self.counter.phase(id) == TurnPhase::ActedOnce {
                tracing::info!(combatant = %id, "Immediate turn requested");
                self.queue.push_immediate(id);
                self.provider.trigger_immediate_turn(id);
            }
        }
        diff
    }
}

fn describe_change(change: &StatChange) -> String {
    let verb = match change.effective_delta {
        d if d >= 2 => "rose sharply",
        1 => "rose",
        0 => "did not change",
        -1 => "fell",
        _ => "fell harshly",
    };
    format!(
        "{}'s {} {} ({} -> {})",
        change.combatant, change.stat, verb, change.old_value, change.new_value
    )
}

impl<P: TurnOrderProvider + std::fmt::Debug> std::fmt::Debug for TurnEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnEngine")
            .field("provider", &self.provider)
            .field("combatants", &self.roster.len())
            .field("weather", &self.weather)
            .field("round", &self.queue.round())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::TeamId;
    use crate::provider::NullProvider;

    fn engine_with(initiatives: &[(u32, u8, i32)]) -> TurnEngine<NullProvider> {
        let mut engine = TurnEngine::new(EngineConfig::default(), NullProvider);
        for &(id, team, init) in initiatives {
            let stats = BaselineStats::DEFAULT.with(Stat::Initiative, init);
            engine
                .join(
                    Combatant::new(CombatantId::new(id), TeamId::new(team)).with_stats(stats),
                )
                .unwrap();
        }
        engine
    }

    fn id(raw: u32) -> CombatantId {
        CombatantId::new(raw)
    }

    #[test]
    fn test_unknown_stat_is_programmer_error() {
        let mut engine = engine_with(&[(1, 0, 10)]);
        let err = engine
            .change_stat_value(id(1), "luck", 1, ChangeSource::Environment)
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownStat("luck".into()));
    }

    #[test]
    fn test_missing_combatant_is_stale() {
        let mut engine = engine_with(&[(1, 0, 10)]);
        let err = engine
            .change_stat(id(9), Stat::Attack, 1, ChangeSource::Environment)
            .unwrap_err();
        assert_eq!(err, EngineError::CombatantNotFound(id(9)));
    }

    #[test]
    fn test_zero_delta_is_noop() {
        let mut engine = engine_with(&[(1, 0, 10)]);
        let change = engine
            .change_stat(id(1), Stat::Initiative, 0, ChangeSource::Environment)
            .unwrap();
        assert_eq!(change.effective_delta, 0);
        assert_eq!(change.new_value, 10);
        assert_eq!(engine.clock(), 0);
    }

    #[test]
    fn test_stage_values_use_baseline() {
        let mut engine = engine_with(&[(1, 0, 10)]);
        let src = ChangeSource::Combatant(id(1));
        engine.change_stat(id(1), Stat::Attack, 1, src).unwrap();
        let change = engine.change_stat(id(1), Stat::Attack, 1, src).unwrap();
        // 10 × 2.0, not 15 × 1.5.
        assert_eq!(change.new_value, 20);
        assert_eq!(change.old_value, 15);
    }

    #[test]
    fn test_direct_stat_ledger_and_floor() {
        let mut engine = engine_with(&[(1, 0, 10), (2, 1, 10)]);
        let change = engine
            .change_stat_value(id(1), "movement", -10, ChangeSource::Combatant(id(2)))
            .unwrap();
        assert_eq!(change.new_value, 1);
        assert_eq!(change.effective_delta, -2);
        assert_eq!(change.stage, None);

        let history = engine.ledger_history(id(1), Stat::Movement);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source_kind, SourceRelation::Enemy);
        assert_eq!(history[0].source_id, Some(id(2)));
    }

    #[test]
    fn test_status_penalty_composes_before_weather() {
        let mut engine = engine_with(&[(1, 0, 10)]);
        engine
            .set_status(id(1), Some(StatusCondition::Paralysis))
            .unwrap();
        assert_eq!(engine.effective_initiative(id(1)), 5);
        engine.set_status(id(1), None).unwrap();
        assert_eq!(engine.effective_initiative(id(1)), 10);
    }

    #[test]
    fn test_leave_purges_records() {
        let mut engine = engine_with(&[(1, 0, 10), (2, 1, 10)]);
        engine
            .change_stat(id(1), Stat::Initiative, 1, ChangeSource::Environment)
            .unwrap();
        engine.leave(id(1)).unwrap();
        assert!(engine.baseline(id(1)).is_none());
        assert_eq!(
            engine.current_stage(id(1), Stat::Initiative),
            Err(EngineError::CombatantNotFound(id(1)))
        );
        assert!(engine.leave(id(1)).is_err());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut engine = engine_with(&[(1, 0, 10), (2, 1, 10)]);
        let before = engine.state_hash();
        engine
            .change_stat(id(1), Stat::Defense, 1, ChangeSource::Environment)
            .unwrap();
        assert_ne!(before, engine.state_hash());
    }
}
