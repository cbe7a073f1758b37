//! Test fixtures and helpers.
//!
//! Pre-built combatants and engines for consistent testing.

use tactics_core::prelude::{
    BaselineStats, Capability, Combatant, CombatantId, EngineConfig, Stat, TeamId, TurnEngine,
    WeatherAbility,
};

use crate::provider::ScriptedProvider;

/// Engine type used throughout the tests.
pub type TestEngine = TurnEngine<ScriptedProvider>;

/// Shorthand for a combatant id.
#[must_use]
pub fn id(raw: u32) -> CombatantId {
    CombatantId::new(raw)
}

/// A living combatant with default stats and the given initiative.
#[must_use]
pub fn combatant(raw_id: u32, team: u8, initiative: i32) -> Combatant {
    Combatant::new(id(raw_id), TeamId::new(team))
        .with_stats(BaselineStats::DEFAULT.with(Stat::Initiative, initiative))
}

/// A combatant carrying a weather ability.
#[must_use]
pub fn weather_combatant(
    raw_id: u32,
    team: u8,
    initiative: i32,
    ability: WeatherAbility,
) -> Combatant {
    combatant(raw_id, team, initiative).with_capability(Capability::Weather(ability))
}

/// Engine with default rules and the given combatants joined.
///
/// # Panics
///
/// Panics if two combatants share an id.
#[must_use]
pub fn engine_with(combatants: Vec<Combatant>) -> TestEngine {
    engine_with_provider(combatants, ScriptedProvider::new())
}

/// Engine with default rules, a prepared provider and the given combatants.
///
/// # Panics
///
/// Panics if two combatants share an id.
#[must_use]
pub fn engine_with_provider(combatants: Vec<Combatant>, provider: ScriptedProvider) -> TestEngine {
    let mut engine = TurnEngine::new(EngineConfig::default(), provider);
    for c in combatants {
        engine.join(c).expect("fixture ids are unique");
    }
    engine
}

/// Two teams: an ally (#1, team 0) and an enemy (#2, team 1) with the given
/// initiatives.
#[must_use]
pub fn duel(ally_initiative: i32, enemy_initiative: i32) -> TestEngine {
    engine_with(vec![
        combatant(1, 0, ally_initiative),
        combatant(2, 1, enemy_initiative),
    ])
}

/// Five rain-boosted combatants (#1..#5, team 0) against one enemy
/// (#10, team 1), all at initiative 10.
#[must_use]
pub fn rain_squad() -> TestEngine {
    let mut combatants: Vec<Combatant> = (1..=5)
        .map(|raw| weather_combatant(raw, 0, 10, WeatherAbility::SwiftSwim))
        .collect();
    combatants.push(combatant(10, 1, 10));
    engine_with(combatants)
}

/// A roster of `size` combatants split over two teams with varied
/// initiatives, for benchmarks and determinism runs.
#[must_use]
pub fn large_roster(size: u32) -> Vec<Combatant> {
    let abilities = WeatherAbility::ALL;
    (1..=size)
        .map(|raw| {
            let team = u8::from(raw % 2 == 0);
            // Spread initiatives so some combatants clear the double-turn bar.
            let initiative = i32::try_from(5 + (raw * 37) % 60).unwrap_or(10);
            let c = combatant(raw, team, initiative);
            if raw % 3 == 0 {
                let ability = abilities[(raw as usize / 3) % abilities.len()];
                c.with_capability(Capability::Weather(ability))
            } else {
                c
            }
        })
        .collect()
}
