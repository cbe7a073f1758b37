//! Combatant identity, capabilities and the battle roster.
//!
//! Capabilities are typed tags attached when a combatant is built. The
//! engine never probes free-form ability text; the only string parsing is
//! [`Capability::from_str`], which exists for config files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::stats::BaselineStats;
use crate::weather::WeatherAbility;

/// Stable unique identifier for a combatant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Team ownership. Combatants on the same team are allies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamId(u8);

impl TeamId {
    /// Wrap a raw team number.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw team number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.0)
    }
}

/// A rules-relevant ability tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Capability {
    /// Every incoming stat change has its sign flipped.
    InvertStatChanges,
    /// Stat decreases from anyone but the combatant itself are refused.
    StatDropImmunity,
    /// Initiative boost while the matching weather holds.
    Weather(WeatherAbility),
}

impl Capability {
    /// Human-readable name used in log text.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::InvertStatChanges => "Invert Stat Changes",
            Self::StatDropImmunity => "Stat Drop Immunity",
            Self::Weather(ability) => ability.display_name(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Capability {
    type Err = EngineError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "invertstatchanges" | "invert" | "contrary" => Ok(Self::InvertStatChanges),
            "statdropimmunity" | "clearbody" | "dropimmunity" => Ok(Self::StatDropImmunity),
            _ => raw
                .parse::<WeatherAbility>()
                .map(Self::Weather)
                .map_err(|_| EngineError::UnknownCapability(raw.to_string())),
        }
    }
}

/// Capability tags of one combatant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability, builder style.
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Check for one capability.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Check whether any of `capabilities` is present.
    #[must_use]
    pub fn has_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|c| self.has(*c))
    }

    /// Weather abilities carried by this combatant.
    pub fn weather_abilities(&self) -> impl Iterator<Item = WeatherAbility> + '_ {
        self.0.iter().filter_map(|c| match c {
            Capability::Weather(ability) => Some(*ability),
            _ => None,
        })
    }

    /// Iterate over all capabilities in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A participant in the battle.
///
/// Current stats are derived from the baseline and the modifier layers and
/// are never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique identifier.
    pub id: CombatantId,
    /// Owning team.
    pub team: TeamId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Liveness flag. Defeated combatants stay in the roster.
    #[serde(default = "default_alive")]
    pub alive: bool,
    /// Stat block used to capture the baseline on first interaction.
    #[serde(default)]
    pub base_stats: BaselineStats,
    /// Typed capability tags.
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

fn default_alive() -> bool {
    true
}

impl Combatant {
    /// Create a living combatant with default stats and no capabilities.
    #[must_use]
    pub fn new(id: CombatantId, team: TeamId) -> Self {
        Self {
            id,
            team,
            name: format!("Combatant {}", id.get()),
            alive: true,
            base_stats: BaselineStats::DEFAULT,
            capabilities: CapabilitySet::new(),
        }
    }

    /// Builder method to set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder method to set the stat block.
    #[must_use]
    pub fn with_stats(mut self, stats: BaselineStats) -> Self {
        self.base_stats = stats;
        self
    }

    /// Builder method to add a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities = self.capabilities.with(capability);
        self
    }

    /// Check whether the combatant carries any of `capabilities`.
    #[must_use]
    pub fn has_capability(&self, capabilities: &[Capability]) -> bool {
        self.capabilities.has_any(capabilities)
    }
}

/// How the originator of a stat change relates to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceRelation {
    /// The target changed its own stat.
    SelfInflicted,
    /// A teammate caused the change.
    Ally,
    /// An opponent caused the change.
    Enemy,
    /// No combatant caused the change (field effects, items, scripts).
    Environment,
}

/// Originator of a stat change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeSource {
    /// Caused by a combatant.
    Combatant(CombatantId),
    /// Caused by the battlefield.
    Environment,
}

/// Arena of every combatant that joined the battle.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    combatants: BTreeMap<CombatantId, Combatant>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant.
    pub fn join(&mut self, combatant: Combatant) -> Result<CombatantId> {
        let id = combatant.id;
        if self.combatants.contains_key(&id) {
            return Err(EngineError::DuplicateCombatant(id));
        }
        self.combatants.insert(id, combatant);
        Ok(id)
    }

    /// Remove a combatant from the battle entirely.
    pub fn leave(&mut self, id: CombatantId) -> Option<Combatant> {
        self.combatants.remove(&id)
    }

    /// Get a combatant by id.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Get a mutable reference to a combatant.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Look up a combatant or report it as missing.
    pub fn require(&self, id: CombatantId) -> Result<&Combatant> {
        self.get(id).ok_or(EngineError::CombatantNotFound(id))
    }

    /// Check if a combatant exists.
    #[must_use]
    pub fn contains(&self, id: CombatantId) -> bool {
        self.combatants.contains_key(&id)
    }

    /// Check if a combatant exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: CombatantId) -> bool {
        self.get(id).is_some_and(|c| c.alive)
    }

    /// Living combatants in ascending id order.
    pub fn living(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values().filter(|c| c.alive)
    }

    /// All combatants in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Sorted ids for deterministic iteration.
    #[must_use]
    pub fn ids(&self) -> Vec<CombatantId> {
        self.combatants.keys().copied().collect()
    }

    /// Classify the originator of a change relative to `target`.
    #[must_use]
    pub fn relation(&self, target: CombatantId, source: ChangeSource) -> SourceRelation {
        let ChangeSource::Combatant(source_id) = source else {
            return SourceRelation::Environment;
        };
        if source_id == target {
            return SourceRelation::SelfInflicted;
        }
        match (self.get(target), self.get(source_id)) {
            (Some(t), Some(s)) if t.team == s.team => SourceRelation::Ally,
            // A source that already left has no team to compare; it counts as hostile.
            _ => SourceRelation::Enemy,
        }
    }

    /// Number of combatants in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Remove every combatant.
    pub fn clear(&mut self) {
        self.combatants.clear();
    }
}
