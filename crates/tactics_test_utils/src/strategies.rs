//! Proptest strategies for engine inputs.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the modifier layers.

use proptest::prelude::*;
use tactics_core::prelude::{Stat, StatusCondition, Weather};

/// A stage delta as produced by moves and abilities.
///
/// Range: -12 to 12, wider than the stage range so clamping is exercised.
pub fn arb_stage_delta() -> impl Strategy<Value = i32> {
    -12i32..=12i32
}

/// A sequence of stage deltas.
pub fn arb_delta_sequence(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(arb_stage_delta(), 0..=max_len)
}

/// One of the five stage-eligible stats.
pub fn arb_staged_stat() -> impl Strategy<Value = Stat> {
    prop::sample::select(Stat::STAGED.to_vec())
}

/// One of the three direct-modifier stats.
pub fn arb_direct_stat() -> impl Strategy<Value = Stat> {
    prop::sample::select(vec![Stat::Accuracy, Stat::ActionPoints, Stat::Movement])
}

/// A baseline initiative.
///
/// Range: 1 to 200.
pub fn arb_initiative() -> impl Strategy<Value = i32> {
    1i32..=200i32
}

/// Any weather.
pub fn arb_weather() -> impl Strategy<Value = Weather> {
    prop::sample::select(vec![
        Weather::Clear,
        Weather::Rain,
        Weather::Sun,
        Weather::Sandstorm,
        Weather::Snow,
    ])
}

/// A status condition or none.
pub fn arb_status() -> impl Strategy<Value = Option<StatusCondition>> {
    prop::option::of(prop::sample::select(vec![
        StatusCondition::Paralysis,
        StatusCondition::Burn,
        StatusCondition::Frostbite,
    ]))
}
