//! Scenario loading and validation.
//!
//! Scenarios define a battle for headless runs: the roster, the starting
//! weather, how many rounds to play and scripted events that fire during
//! those rounds.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::prelude::{
    BaselineStats, Capability, Combatant, CombatantId, EngineConfig, EngineError, Stat,
    StatusCondition, TeamId, Weather,
};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected part of the scenario.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// The scenario is structurally inconsistent.
    #[error("Invalid scenario: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

fn default_rounds() -> u32 {
    3
}

/// A complete battle scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rule overrides; the default rules apply when absent.
    #[serde(default)]
    pub config: Option<EngineConfig>,
    /// Participants.
    pub combatants: Vec<CombatantSetup>,
    /// Weather at battle start.
    #[serde(default)]
    pub weather: Weather,
    /// Number of rounds to play.
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Scripted events.
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
    /// Combatants whose next batch update is rejected by the turn-order
    /// system once.
    #[serde(default)]
    pub fail_once: Vec<u32>,
}

/// One participant of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantSetup {
    /// Unique id.
    pub id: u32,
    /// Owning team.
    pub team: u8,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Baseline initiative.
    pub initiative: i32,
    /// Other baseline overrides keyed by stat name.
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    /// Capability names.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl CombatantSetup {
    /// Create a setup with default stats and no capabilities.
    #[must_use]
    pub fn new(id: u32, team: u8, initiative: i32) -> Self {
        Self {
            id,
            team,
            name: String::new(),
            initiative,
            stats: BTreeMap::new(),
            capabilities: Vec::new(),
        }
    }

    /// Builder method to add a capability by name.
    #[must_use]
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.push(name.into());
        self
    }

    /// Convert into an engine combatant.
    ///
    /// # Errors
    ///
    /// Returns an error if a stat or capability name is unknown.
    pub fn to_combatant(&self) -> Result<Combatant, EngineError> {
        let mut stats = BaselineStats::DEFAULT.with(Stat::Initiative, self.initiative);
        for (name, value) in &self.stats {
            stats = stats.with(name.parse()?, *value);
        }

        let mut combatant =
            Combatant::new(CombatantId::new(self.id), TeamId::new(self.team)).with_stats(stats);
        if !self.name.is_empty() {
            combatant = combatant.with_name(self.name.clone());
        }
        for name in &self.capabilities {
            combatant = combatant.with_capability(name.parse::<Capability>()?);
        }
        Ok(combatant)
    }
}

/// An event that fires during a given round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedEvent {
    /// Round in which the event fires, starting at 1.
    pub round: u32,
    /// Number of actions resolved in that round before the event fires.
    #[serde(default)]
    pub after_actions: u32,
    /// What happens.
    pub action: EventAction,
}

/// Scripted battle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventAction {
    /// Change the weather.
    Weather(Weather),
    /// Change a stat.
    StatChange {
        /// Targeted combatant.
        target: u32,
        /// Stat name, aliases allowed.
        stat: String,
        /// Signed change amount.
        delta: i32,
        /// Originating combatant; the battlefield when absent.
        #[serde(default)]
        source: Option<u32>,
    },
    /// Set or clear a status condition.
    Status {
        /// Targeted combatant.
        target: u32,
        /// New condition.
        condition: Option<StatusCondition>,
    },
    /// Mark a combatant defeated.
    Defeat(u32),
    /// Remove a combatant from the battle.
    Remove(u32),
}

impl EventAction {
    fn referenced_ids(&self) -> Vec<u32> {
        match self {
            Self::Weather(_) => Vec::new(),
            Self::StatChange { target, source, .. } => {
                std::iter::once(*target).chain(*source).collect()
            }
            Self::Status { target, .. } | Self::Defeat(target) | Self::Remove(target) => {
                vec![*target]
            }
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Returns an error if the RON is malformed.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A small rain battle: two swift swimmers against one fast enemy.
    #[must_use]
    pub fn rain_skirmish() -> Self {
        Self {
            name: "Rain Skirmish".to_string(),
            description: "Swift swimmers overtake a fast enemy once the rain starts".to_string(),
            config: None,
            combatants: vec![
                CombatantSetup::new(1, 0, 10).with_capability("Swift Swim"),
                CombatantSetup::new(2, 0, 8).with_capability("Swift Swim"),
                CombatantSetup::new(3, 1, 9),
            ],
            weather: Weather::Clear,
            rounds: 3,
            events: vec![ScriptedEvent {
                round: 2,
                after_actions: 0,
                action: EventAction::Weather(Weather::Rain),
            }],
            fail_once: Vec::new(),
        }
    }

    /// Rules to build the engine with.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Build the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if a stat or capability name is unknown.
    pub fn build_combatants(&self) -> Result<Vec<Combatant>, ScenarioError> {
        self.combatants
            .iter()
            .map(|setup| setup.to_combatant().map_err(ScenarioError::from))
            .collect()
    }

    /// Events for one round, in firing order.
    #[must_use]
    pub fn events_for(&self, round: u32) -> Vec<&ScriptedEvent> {
        let mut events: Vec<_> = self.events.iter().filter(|e| e.round == round).collect();
        // Stable, so events with the same trigger keep file order.
        events.sort_by_key(|e| e.after_actions);
        events
    }

    /// Collect every structural problem.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.combatants.is_empty() {
            problems.push("scenario has no combatants".to_string());
        }
        if self.rounds == 0 {
            problems.push("scenario must play at least one round".to_string());
        }

        let mut ids = BTreeSet::new();
        for setup in &self.combatants {
            if !ids.insert(setup.id) {
                problems.push(format!("duplicate combatant id {}", setup.id));
            }
            if setup.initiative < 0 {
                problems.push(format!("combatant {} has negative initiative", setup.id));
            }
            if let Err(err) = setup.to_combatant() {
                problems.push(format!("combatant {}: {err}", setup.id));
            }
        }

        let teams: BTreeSet<u8> = self.combatants.iter().map(|c| c.team).collect();
        if teams.len() < 2 && !self.combatants.is_empty() {
            problems.push("scenario needs at least two teams".to_string());
        }

        for (index, event) in self.events.iter().enumerate() {
            if event.round == 0 || event.round > self.rounds {
                problems.push(format!(
                    "event {index} fires in round {} outside 1..={}",
                    event.round, self.rounds
                ));
            }
            for id in event.action.referenced_ids() {
                if !ids.contains(&id) {
                    problems.push(format!("event {index} references unknown combatant {id}"));
                }
            }
            if let EventAction::StatChange { stat, .. } = &event.action {
                if let Err(err) = stat.parse::<Stat>() {
                    problems.push(format!("event {index}: {err}"));
                }
            }
        }

        for id in &self.fail_once {
            if !ids.contains(id) {
                problems.push(format!("fault injection targets unknown combatant {id}"));
            }
        }

        if let Some(config) = &self.config {
            problems.extend(config.validate());
        }

        problems
    }

    /// Validate the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScenarioError::Invalid(problems))
        }
    }
}
