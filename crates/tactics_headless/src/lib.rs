//! Headless battle runner for scenario testing and CI verification.
//!
//! Loads a battle scenario from RON, plays it through the turn-order engine
//! and reports what happened as JSON:
//!
//! - **Scenario testing**: Scripted weather, stat and status events
//! - **CI verification**: The final state hash pins engine behaviour
//! - **Fault injection**: Turn-order batch failures on chosen combatants
//!
//! # Example
//!
//! ```bash
//! # Play a scenario
//! cargo run -p tactics_headless -- run --scenario scenarios/rain_skirmish.ron --pretty
//!
//! # Check a scenario without playing it
//! cargo run -p tactics_headless -- validate scenarios/rain_skirmish.ron
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{
    run_scenario_file, ActionRecord, BattleReport, BattleRunner, CombatantReport,
    LoggingTurnOrder, RoundReport,
};
pub use scenario::{CombatantSetup, EventAction, Scenario, ScenarioError, ScriptedEvent};
