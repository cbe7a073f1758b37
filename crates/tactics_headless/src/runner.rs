//! Headless battle runner.
//!
//! Drives a [`Scenario`] through the engine round by round and collects a
//! [`BattleReport`] that serializes to JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tactics_core::prelude::{
    BoostOutcome, ChangeSource, CombatantId, InitiativeUpdate, SlotKind, StatChange,
    StatusCondition, TurnEngine, TurnOrderProvider, UpdateResult, Weather, WeatherAbility,
};

use crate::scenario::{EventAction, Scenario, ScenarioError, ScriptedEvent};

// ============================================================================
// Turn-order provider
// ============================================================================

/// Turn-order collaborator that logs every request through `tracing`.
///
/// Batch items for combatants listed in the fault list are rejected once,
/// which exercises the engine's retry path.
#[derive(Debug, Clone, Default)]
pub struct LoggingTurnOrder {
    published: BTreeMap<CombatantId, i32>,
    fail_once: BTreeSet<CombatantId>,
    immediate: Vec<CombatantId>,
    log: Vec<String>,
    persisted: usize,
}

impl LoggingTurnOrder {
    /// Create a provider that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that rejects one batch item for each of `ids`.
    #[must_use]
    pub fn with_faults(ids: impl IntoIterator<Item = CombatantId>) -> Self {
        Self {
            fail_once: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Last initiative accepted for a combatant.
    #[must_use]
    pub fn published(&self, id: CombatantId) -> Option<i32> {
        self.published.get(&id).copied()
    }

    /// Battle log lines so far.
    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Number of persisted stat changes.
    #[must_use]
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    /// Drain immediate-turn requests received since the last call.
    pub fn take_immediate(&mut self) -> Vec<CombatantId> {
        std::mem::take(&mut self.immediate)
    }
}

impl TurnOrderProvider for LoggingTurnOrder {
    fn apply_initiative_update(&mut self, update: &InitiativeUpdate) {
        tracing::debug!(
            combatant = %update.id,
            value = update.new_value,
            reason = ?update.reason,
            "Initiative update"
        );
        self.published.insert(update.id, update.new_value);
    }

    fn apply_initiative_updates_batch(
        &mut self,
        updates: &[InitiativeUpdate],
    ) -> Vec<UpdateResult> {
        updates
            .iter()
            .map(|update| {
                if self.fail_once.remove(&update.id) {
                    tracing::warn!(combatant = %update.id, "Injected batch failure");
                    return UpdateResult {
                        id: update.id,
                        success: false,
                    };
                }
                self.apply_initiative_update(update);
                UpdateResult {
                    id: update.id,
                    success: true,
                }
            })
            .collect()
    }

    fn trigger_immediate_turn(&mut self, id: CombatantId) {
        tracing::info!(combatant = %id, "Immediate turn requested");
        self.immediate.push(id);
    }

    fn log_event(&mut self, text: &str) {
        tracing::info!("{text}");
        self.log.push(text.to_string());
    }

    fn persist_stat_change(&mut self, change: &StatChange) {
        tracing::trace!(
            combatant = %change.combatant,
            stat = ?change.stat,
            value = change.new_value,
            "Persisted stat change"
        );
        self.persisted += 1;
    }
}

// ============================================================================
// Report
// ============================================================================

/// One resolved action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Acting combatant.
    pub combatant: u32,
    /// Slot type.
    pub kind: SlotKind,
}

/// Everything that happened in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number, starting at 1.
    pub round: u32,
    /// Weather when the round ended.
    pub weather: Weather,
    /// Actions in resolution order.
    pub actions: Vec<ActionRecord>,
    /// Number of bonus actions.
    pub bonus_actions: usize,
    /// Combatants granted an immediate turn mid-round.
    pub immediate_turns: Vec<u32>,
    /// Combatants qualifying for double turns at round end.
    pub double_turns: Vec<u32>,
    /// Refused or failed requests, as log text.
    pub refusals: Vec<String>,
}

/// End-of-battle state of one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantReport {
    /// Id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Team.
    pub team: u8,
    /// Liveness.
    pub alive: bool,
    /// Effective initiative.
    pub initiative: i32,
    /// Active weather boost, if any.
    pub boost: Option<WeatherAbility>,
    /// Active status condition, if any.
    pub status: Option<StatusCondition>,
}

/// Result of a headless battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Scenario name.
    pub scenario: String,
    /// Failures while applying the starting weather.
    pub opening: Vec<String>,
    /// Per-round details.
    pub rounds: Vec<RoundReport>,
    /// Weather at the end.
    pub final_weather: Weather,
    /// Remaining combatants.
    pub combatants: Vec<CombatantReport>,
    /// Number of battle log lines emitted.
    pub log_lines: usize,
    /// Number of persisted stat changes.
    pub persisted_changes: usize,
    /// Deterministic hash of the final engine state.
    pub state_hash: u64,
}

impl BattleReport {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs one scenario to completion.
pub struct BattleRunner {
    scenario: Scenario,
    engine: TurnEngine<LoggingTurnOrder>,
}

impl BattleRunner {
    /// Validate the scenario and build the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid.
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let provider = LoggingTurnOrder::with_faults(
            scenario.fail_once.iter().copied().map(CombatantId::new),
        );
        let mut engine = TurnEngine::new(scenario.engine_config(), provider);
        for combatant in scenario.build_combatants()? {
            engine.join(combatant)?;
        }

        Ok(Self { scenario, engine })
    }

    /// The engine being driven.
    #[must_use]
    pub fn engine(&self) -> &TurnEngine<LoggingTurnOrder> {
        &self.engine
    }

    /// Play the battle. `rounds` overrides the scenario's round count.
    pub fn run(mut self, rounds: Option<u32>) -> BattleReport {
        let total = rounds.unwrap_or(self.scenario.rounds);
        tracing::info!(scenario = %self.scenario.name, rounds = total, "Starting battle");

        let mut opening = Vec::new();
        if self.scenario.weather != Weather::Clear {
            let outcomes = self.engine.set_weather(self.scenario.weather);
            note_failures(&outcomes, &mut opening);
        }
        let outcomes = self.engine.start_battle();
        note_failures(&outcomes, &mut opening);

        let reports = (0..total).map(|_| self.play_round()).collect();

        let report = self.finish(opening, reports);
        tracing::info!(
            scenario = %report.scenario,
            hash = report.state_hash,
            "Battle finished"
        );
        report
    }

    fn play_round(&mut self) -> RoundReport {
        // Events are keyed by the round about to begin.
        let number = self.engine.round() + 1;
        let events: Vec<ScriptedEvent> = self
            .scenario
            .events_for(number)
            .into_iter()
            .cloned()
            .collect();
        let mut pending = events.into_iter().peekable();

        let mut report = RoundReport {
            round: number,
            ..RoundReport::default()
        };

        self.fire_due(&mut pending, 0, &mut report);
        self.engine.provider_mut().take_immediate();
        self.engine.begin_round();
        tracing::debug!(round = number, "Round started");

        let mut resolved = 0u32;
        loop {
            self.fire_due(&mut pending, resolved, &mut report);
            let Some(slot) = self.engine.next_turn() else {
                break;
            };
            if slot.kind == SlotKind::Bonus {
                report.bonus_actions += 1;
            }
            if let Err(err) = self.engine.end_turn(slot.id) {
                report.refusals.push(err.to_string());
            }
            report.actions.push(ActionRecord {
                combatant: slot.id.get(),
                kind: slot.kind,
            });
            resolved += 1;
        }
        // Events scheduled past the last action still fire this round.
        self.fire_due(&mut pending, u32::MAX, &mut report);

        report.immediate_turns = self
            .engine
            .provider_mut()
            .take_immediate()
            .into_iter()
            .map(CombatantId::get)
            .collect();
        report.double_turns = self
            .engine
            .double_turn_set()
            .into_iter()
            .map(CombatantId::get)
            .collect();
        report.weather = self.engine.weather();
        report
    }

    fn fire_due<I>(
        &mut self,
        pending: &mut std::iter::Peekable<I>,
        resolved: u32,
        report: &mut RoundReport,
    ) where
        I: Iterator<Item = ScriptedEvent>,
    {
        while let Some(event) = pending.next_if(|e| e.after_actions <= resolved) {
            self.fire(&event.action, report);
        }
    }

    fn fire(&mut self, action: &EventAction, report: &mut RoundReport) {
        tracing::debug!(?action, "Scripted event");
        let result = match action {
            EventAction::Weather(weather) => {
                let outcomes = self.engine.set_weather(*weather);
                note_failures(&outcomes, &mut report.refusals);
                Ok(())
            }
            EventAction::StatChange {
                target,
                stat,
                delta,
                source,
            } => {
                let source = source.map_or(ChangeSource::Environment, |raw| {
                    ChangeSource::Combatant(CombatantId::new(raw))
                });
                self.engine
                    .change_stat_value(CombatantId::new(*target), stat, *delta, source)
                    .map(|_| ())
            }
            EventAction::Status { target, condition } => self
                .engine
                .set_status(CombatantId::new(*target), *condition)
                .map(|_| ()),
            EventAction::Defeat(target) => self.engine.mark_defeated(CombatantId::new(*target)),
            EventAction::Remove(target) => {
                self.engine.leave(CombatantId::new(*target)).map(|_| ())
            }
        };
        if let Err(err) = result {
            report.refusals.push(err.to_string());
        }
    }

    fn finish(self, opening: Vec<String>, rounds: Vec<RoundReport>) -> BattleReport {
        let engine = &self.engine;
        let combatants = engine
            .roster()
            .iter()
            .map(|c| CombatantReport {
                id: c.id.get(),
                name: c.name.clone(),
                team: c.team.get(),
                alive: c.alive,
                initiative: engine.effective_initiative(c.id),
                boost: engine.boost_of(c.id),
                status: engine.status(c.id),
            })
            .collect();

        BattleReport {
            scenario: self.scenario.name.clone(),
            opening,
            rounds,
            final_weather: engine.weather(),
            combatants,
            log_lines: engine.provider().log().len(),
            persisted_changes: engine.provider().persisted(),
            state_hash: engine.state_hash(),
        }
    }
}

fn note_failures(outcomes: &[BoostOutcome], refusals: &mut Vec<String>) {
    refusals.extend(
        outcomes
            .iter()
            .filter_map(BoostOutcome::partial_failure)
            .map(|err| err.to_string()),
    );
}

/// Load, validate and play a scenario file.
///
/// # Errors
///
/// Returns an error if the scenario cannot be loaded or is invalid.
pub fn run_scenario_file(
    path: &std::path::Path,
    rounds: Option<u32>,
) -> Result<BattleReport, ScenarioError> {
    let scenario = Scenario::load(path)?;
    Ok(BattleRunner::new(scenario)?.run(rounds))
}
