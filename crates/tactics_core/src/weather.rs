//! Weather and the weather-ability initiative boost.
//!
//! The boost is a multiplicative layer on top of every other initiative
//! modifier. It is applied and reverted in batches, one per weather
//! transition and ability, using an explicit request/response pair:
//!
//! 1. [`BoostTracker::stage_boost`] decides what should change and returns a
//!    [`BoostBatch`] of initiative updates. Nothing is recorded yet.
//! 2. The caller submits the batch to the turn-order provider.
//! 3. [`BoostTracker::complete_boost`] receives the provider's per-item
//!    results and records only the items that succeeded.
//!
//! Several batches may be in flight. Each staged item stamps its combatant
//! with the batch id; a completion whose stamp has since been replaced by a
//! newer batch (or removed because the combatant left) is skipped, so a
//! slow batch can never undo the bookkeeping of a faster, later one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::error::EngineError;
use crate::math::{scale_by_percent, Percent};
use crate::provider::{InitiativeUpdate, UpdateReason, UpdateResult};

/// Global battlefield weather.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    /// No weather.
    #[default]
    Clear,
    /// Rain.
    Rain,
    /// Harsh sunlight.
    Sun,
    /// Sandstorm.
    Sandstorm,
    /// Snow.
    Snow,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Sun => "sun",
            Self::Sandstorm => "sandstorm",
            Self::Snow => "snow",
        };
        f.write_str(name)
    }
}

impl FromStr for Weather {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clear" | "none" => Ok(Self::Clear),
            "rain" | "raining" => Ok(Self::Rain),
            "sun" | "sunny" | "harshsunlight" => Ok(Self::Sun),
            "sandstorm" | "sand" => Ok(Self::Sandstorm),
            "snow" | "hail" => Ok(Self::Snow),
            _ => Err(EngineError::UnknownWeather(raw.to_string())),
        }
    }
}

/// An ability that boosts initiative while a specific weather holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum WeatherAbility {
    /// Faster in rain.
    SwiftSwim,
    /// Faster in harsh sunlight.
    Chlorophyll,
    /// Faster in a sandstorm.
    SandRush,
    /// Faster in snow.
    SlushRush,
}

impl WeatherAbility {
    /// Every known weather ability.
    pub const ALL: [WeatherAbility; 4] = [
        WeatherAbility::SwiftSwim,
        WeatherAbility::Chlorophyll,
        WeatherAbility::SandRush,
        WeatherAbility::SlushRush,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::SwiftSwim => "Swift Swim",
            Self::Chlorophyll => "Chlorophyll",
            Self::SandRush => "Sand Rush",
            Self::SlushRush => "Slush Rush",
        }
    }

    /// Weather that activates this ability.
    #[must_use]
    pub const fn weather(self) -> Weather {
        match self {
            Self::SwiftSwim => Weather::Rain,
            Self::Chlorophyll => Weather::Sun,
            Self::SandRush => Weather::Sandstorm,
            Self::SlushRush => Weather::Snow,
        }
    }

    /// Whether the ability is active under `weather`.
    #[must_use]
    pub fn is_active_in(self, weather: Weather) -> bool {
        self.weather() == weather
    }
}

impl fmt::Display for WeatherAbility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for WeatherAbility {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "swiftswim" => Ok(Self::SwiftSwim),
            "chlorophyll" => Ok(Self::Chlorophyll),
            "sandrush" => Ok(Self::SandRush),
            "slushrush" => Ok(Self::SlushRush),
            _ => Err(EngineError::UnknownCapability(raw.to_string())),
        }
    }
}

/// Abilities a weather transition must evaluate: those tied to the old or
/// the new weather, in registration order.
#[must_use]
pub fn relevant_abilities(
    registered: &[WeatherAbility],
    old: Weather,
    new: Weather,
) -> Vec<WeatherAbility> {
    if old == new {
        return Vec::new();
    }
    registered
        .iter()
        .copied()
        .filter(|a| a.is_active_in(old) || a.is_active_in(new))
        .collect()
}

/// Identifier of a staged boost batch. Later batches have larger ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BatchId(u64);

impl BatchId {
    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}", self.0)
    }
}

/// Whether an item applies or removes a boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoostAction {
    /// Record the boost on success.
    Apply,
    /// Clear the boost record on success.
    Restore,
}

/// One staged update of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostItem {
    /// Initiative update to submit.
    pub update: InitiativeUpdate,
    /// Bookkeeping to perform if the update succeeds.
    pub action: BoostAction,
}

/// A staged batch awaiting the provider's results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostBatch {
    /// Staging token of this batch.
    pub id: BatchId,
    /// Ability this batch was staged for.
    pub ability: WeatherAbility,
    /// Staged items in ascending combatant order.
    pub items: Vec<BoostItem>,
}

impl BoostBatch {
    /// Updates to submit to the provider.
    #[must_use]
    pub fn updates(&self) -> Vec<InitiativeUpdate> {
        self.items.iter().map(|item| item.update).collect()
    }

    /// Whether the batch contains nothing to submit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of staged items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Result of completing a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoostOutcome {
    /// Combatants whose boost is now recorded.
    pub applied: Vec<CombatantId>,
    /// Combatants whose boost record was cleared.
    pub restored: Vec<CombatantId>,
    /// Items the provider reported as failed; left untouched for retry.
    pub failed: Vec<CombatantId>,
    /// Items superseded by a newer batch or whose combatant left.
    pub skipped: Vec<CombatantId>,
}

impl BoostOutcome {
    /// Whether any bookkeeping changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.applied.is_empty() || !self.restored.is_empty()
    }

    /// The partial failure of this batch, if any item failed.
    #[must_use]
    pub fn partial_failure(&self) -> Option<EngineError> {
        if self.failed.is_empty() {
            return None;
        }
        let succeeded = self.applied.len() + self.restored.len();
        Some(EngineError::PartialBatchFailure {
            requested: succeeded + self.failed.len(),
            succeeded,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Staged {
    batch: BatchId,
    ability: WeatherAbility,
    action: BoostAction,
}

/// Weather boost bookkeeping for every combatant.
#[derive(Debug, Clone, Default)]
pub struct BoostTracker {
    /// Active boosts. A combatant holds at most one.
    records: BTreeMap<CombatantId, WeatherAbility>,
    /// Pre-boost initiative captured at first boost.
    true_original: BTreeMap<CombatantId, i32>,
    /// Latest staged item per combatant, cleared on completion.
    staged: BTreeMap<CombatantId, Staged>,
    next_batch: u64,
}

impl BoostTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the boost (or its reversal) for one ability.
    ///
    /// `candidates` are the living combatants carrying `ability` with their
    /// pre-weather initiative. When `active` is true every candidate without
    /// a boost is staged for one; otherwise every combatant boosted by this
    /// ability is staged for restoration to its true original initiative.
    /// Intent from still-pending batches counts as already decided.
    pub fn stage_boost<I>(
        &mut self,
        ability: WeatherAbility,
        active: bool,
        candidates: I,
        boost_percent: Percent,
    ) -> BoostBatch
    where
        I: IntoIterator<Item = (CombatantId, i32)>,
    {
        self.next_batch += 1;
        let id = BatchId(self.next_batch);
        let mut items = Vec::new();

        if active {
            let mut candidates: Vec<_> = candidates.into_iter().collect();
            candidates.sort_by_key(|&(cid, _)| cid);
            candidates.dedup_by_key(|&mut (cid, _)| cid);

            for (cid, pre_weather) in candidates {
                if self.projected(cid).is_some() {
                    continue;
                }
                let original = *self.true_original.entry(cid).or_insert(pre_weather);
                items.push(BoostItem {
                    update: InitiativeUpdate::new(
                        cid,
                        scale_by_percent(original, boost_percent),
                        UpdateReason::WeatherBoost,
                    ),
                    action: BoostAction::Apply,
                });
            }
        } else {
            let boosted: Vec<CombatantId> = self
                .records
                .keys()
                .chain(self.staged.keys())
                .copied()
                .filter(|&cid| self.projected(cid) == Some(ability))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            for cid in boosted {
                let Some(&original) = self.true_original.get(&cid) else {
                    continue;
                };
                items.push(BoostItem {
                    update: InitiativeUpdate::new(cid, original, UpdateReason::WeatherRestore),
                    action: BoostAction::Restore,
                });
            }
        }

        for item in &items {
            self.staged.insert(
                item.update.id,
                Staged {
                    batch: id,
                    ability,
                    action: item.action,
                },
            );
        }

        tracing::debug!(
            batch = id.get(),
            ability = ?ability,
            active,
            items = items.len(),
            "Staged weather boost batch"
        );

        BoostBatch { id, ability, items }
    }

    /// Record the outcome of a submitted batch.
    ///
    /// Only items that `results` reports as succeeded change bookkeeping.
    /// An item with no matching result counts as failed.
    pub fn complete_boost(
        &mut self,
        batch: &BoostBatch,
        results: &[UpdateResult],
    ) -> BoostOutcome {
        let mut outcome = BoostOutcome::default();

        for item in &batch.items {
            let cid = item.update.id;
            let current = self.staged.get(&cid).copied();
            if current.map(|s| s.batch) != Some(batch.id) {
                outcome.skipped.push(cid);
                continue;
            }
            self.staged.remove(&cid);

            let success = results.iter().any(|r| r.id == cid && r.success);
            if !success {
                outcome.failed.push(cid);
                continue;
            }

            match item.action {
                BoostAction::Apply => {
                    self.records.insert(cid, batch.ability);
                    outcome.applied.push(cid);
                }
                BoostAction::Restore => {
                    self.records.remove(&cid);
                    outcome.restored.push(cid);
                }
            }
        }

        if let Some(err) = outcome.partial_failure() {
            tracing::debug!(
                batch = batch.id.get(),
                error = %err,
                "Boost batch left items for retry"
            );
        }
        if !outcome.skipped.is_empty() {
            tracing::warn!(
                batch = batch.id.get(),
                skipped = outcome.skipped.len(),
                "Stale boost items skipped on completion"
            );
        }

        outcome
    }

    /// Remove one combatant's boost immediately.
    ///
    /// Returns the restoring update when a boost was active. Pending staged
    /// items for the combatant are cancelled.
    pub fn remove_boost(
        &mut self,
        id: CombatantId,
        reason: UpdateReason,
    ) -> Option<InitiativeUpdate> {
        self.staged.remove(&id);
        self.records.remove(&id)?;
        let original = self.true_original.get(&id).copied()?;
        Some(InitiativeUpdate::new(id, original, reason))
    }

    /// Remove every boost immediately, cancelling pending batches.
    ///
    /// Returns the restoring update of every combatant that was boosted.
    pub fn reset_all(&mut self) -> Vec<InitiativeUpdate> {
        self.staged.clear();
        let records = std::mem::take(&mut self.records);
        records
            .into_keys()
            .filter_map(|id| {
                self.true_original
                    .get(&id)
                    .map(|&v| InitiativeUpdate::new(id, v, UpdateReason::Reset))
            })
            .collect()
    }

    /// Replace a captured true original after the layers below the weather
    /// boost changed. No-op if nothing was captured yet.
    pub fn rebase_original(&mut self, id: CombatantId, pre_weather: i32) {
        if let Some(original) = self.true_original.get_mut(&id) {
            *original = pre_weather;
        }
    }

    /// Forget everything about a combatant that left the battle.
    pub fn purge(&mut self, id: CombatantId) {
        self.records.remove(&id);
        self.true_original.remove(&id);
        self.staged.remove(&id);
    }

    /// Forget every captured true original.
    pub fn clear_originals(&mut self) {
        self.true_original.clear();
    }

    /// Ability currently boosting `id`.
    #[must_use]
    pub fn boost_of(&self, id: CombatantId) -> Option<WeatherAbility> {
        self.records.get(&id).copied()
    }

    /// Whether `id` holds a recorded boost.
    #[must_use]
    pub fn is_boosted(&self, id: CombatantId) -> bool {
        self.records.contains_key(&id)
    }

    /// Captured true original initiative.
    #[must_use]
    pub fn true_original(&self, id: CombatantId) -> Option<i32> {
        self.true_original.get(&id).copied()
    }

    /// Whether `id` has an item in a batch that has not completed yet.
    #[must_use]
    pub fn is_pending(&self, id: CombatantId) -> bool {
        self.staged.contains_key(&id)
    }

    /// Recorded boosts in id order.
    pub fn records(&self) -> impl Iterator<Item = (CombatantId, WeatherAbility)> + '_ {
        self.records.iter().map(|(&id, &a)| (id, a))
    }

    /// Boost state once every pending item succeeds.
    fn projected(&self, id: CombatantId) -> Option<WeatherAbility> {
        match self.staged.get(&id) {
            Some(Staged {
                action: BoostAction::Apply,
                ability,
                ..
            }) => Some(*ability),
            Some(Staged {
                action: BoostAction::Restore,
                ..
            }) => None,
            None => self.boost_of(id),
        }
    }
}
