//! Weather-ability boost layer: toggling, batching and stale completions.

use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{
    combatant, engine_with, engine_with_provider, id, rain_squad, weather_combatant, TestEngine,
};
use tactics_test_utils::provider::ScriptedProvider;

fn swift_swimmer_duel(initiative: i32) -> TestEngine {
    engine_with(vec![
        weather_combatant(1, 0, initiative, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ])
}

/// Engine whose weather changes evaluate no abilities, so batches can be
/// staged and completed by hand.
fn manual_engine(combatants: Vec<Combatant>) -> TestEngine {
    let config = EngineConfig {
        weather_abilities: Vec::new(),
        ..EngineConfig::default()
    };
    let mut engine = TurnEngine::new(config, ScriptedProvider::new());
    for c in combatants {
        engine.join(c).unwrap();
    }
    engine
}

fn submit(engine: &mut TestEngine, batch: &BoostBatch) -> Vec<UpdateResult> {
    engine
        .provider_mut()
        .apply_initiative_updates_batch(&batch.updates())
}

// =========================================================================
// End to end
// =========================================================================

#[test]
fn test_stage_then_boost_then_remove_restores_staged_value() {
    let mut engine = swift_swimmer_duel(10);

    let staged = engine
        .change_stat_value(id(1), "initiative", 2, ChangeSource::Combatant(id(1)))
        .unwrap();
    assert_eq!(staged.stage, Some(2));
    assert_eq!(staged.new_value, 20);

    engine.set_weather(Weather::Rain);
    assert_eq!(engine.true_original_initiative(id(1)), Some(20));
    assert_eq!(engine.effective_initiative(id(1)), 40);
    assert_eq!(engine.provider().last_value(id(1)), Some(40));

    assert_eq!(engine.remove_weather_ability_boost(id(1)), Ok(true));
    assert_eq!(engine.effective_initiative(id(1)), 20);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));
    assert_eq!(engine.current_stage(id(1), Stat::Initiative), Ok(2));

    assert_eq!(engine.remove_weather_ability_boost(id(1)), Ok(false));
}

#[test]
fn test_ten_toggles_return_to_pre_boost_value() {
    // 7 at stage -1 is round(4.69) = 5, so rounding happens at every layer.
    let mut engine = swift_swimmer_duel(7);
    engine
        .change_stat(id(1), Stat::Initiative, -1, ChangeSource::Environment)
        .unwrap();
    let before = engine.effective_initiative(id(1));
    assert_eq!(before, 5);

    for _ in 0..10 {
        engine.set_weather(Weather::Rain);
        assert_eq!(engine.effective_initiative(id(1)), 10);
        engine.set_weather(Weather::Clear);
    }

    assert_eq!(engine.effective_initiative(id(1)), before);
    assert_eq!(engine.provider().last_value(id(1)), Some(before));
    assert_eq!(engine.boost_of(id(1)), None);
}

#[test]
fn test_stage_change_while_boosted_rebases_original() {
    let mut engine = swift_swimmer_duel(10);
    engine.set_weather(Weather::Rain);
    assert_eq!(engine.effective_initiative(id(1)), 20);

    let change = engine
        .change_stat(id(1), Stat::Initiative, 2, ChangeSource::Environment)
        .unwrap();
    assert_eq!(change.old_value, 20);
    assert_eq!(change.new_value, 40);
    assert_eq!(engine.true_original_initiative(id(1)), Some(20));

    engine.set_weather(Weather::Clear);
    assert_eq!(engine.effective_initiative(id(1)), 20);
}

#[test]
fn test_status_penalty_sits_below_weather_boost() {
    let mut engine = swift_swimmer_duel(10);
    engine.set_weather(Weather::Rain);
    engine
        .set_status(id(1), Some(StatusCondition::Paralysis))
        .unwrap();
    assert_eq!(engine.effective_initiative(id(1)), 10);

    engine.set_weather(Weather::Clear);
    assert_eq!(engine.effective_initiative(id(1)), 5);
    engine.set_status(id(1), None).unwrap();
    assert_eq!(engine.effective_initiative(id(1)), 10);
}

// =========================================================================
// Weather manager
// =========================================================================

#[test]
fn test_only_relevant_abilities_are_evaluated() {
    let mut engine = engine_with(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        weather_combatant(2, 0, 10, WeatherAbility::Chlorophyll),
        weather_combatant(3, 1, 10, WeatherAbility::SandRush),
    ]);

    engine.set_weather(Weather::Rain);
    assert_eq!(engine.provider().batches.len(), 1);

    let outcomes = engine.set_weather(Weather::Sun);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(engine.boost_of(id(1)), None);
    assert_eq!(engine.boost_of(id(2)), Some(WeatherAbility::Chlorophyll));
    assert_eq!(engine.boost_of(id(3)), None);
}

#[test]
fn test_start_battle_applies_current_weather() {
    let mut engine = engine_with(Vec::new());
    engine.set_weather(Weather::Sun);
    engine
        .join(weather_combatant(1, 0, 10, WeatherAbility::Chlorophyll))
        .unwrap();
    engine.join(combatant(2, 1, 4)).unwrap();
    assert_eq!(engine.effective_initiative(id(1)), 10);

    let outcomes = engine.start_battle();
    assert_eq!(outcomes.len(), WeatherAbility::ALL.len());
    assert_eq!(engine.effective_initiative(id(1)), 20);
    // 20 / 2 = 10 > 4
    assert!(engine.has_double_turns(id(1)));
}

#[test]
fn test_weather_change_without_carriers_still_recomputes() {
    let mut engine = engine_with(vec![combatant(1, 0, 12), combatant(2, 1, 5)]);
    engine.set_weather(Weather::Snow);
    assert!(engine.has_double_turns(id(1)));
}

// =========================================================================
// Batches
// =========================================================================

#[test]
fn test_failed_item_stays_boosted_and_is_retried() {
    let mut engine = rain_squad();
    engine.set_weather(Weather::Rain);
    for raw in 1..=5 {
        assert_eq!(engine.boost_of(id(raw)), Some(WeatherAbility::SwiftSwim));
    }

    engine.provider_mut().fail_next(id(3));
    let outcomes = engine.set_weather(Weather::Clear);
    let outcome = &outcomes[0];
    assert_eq!(outcome.restored, vec![id(1), id(2), id(4), id(5)]);
    assert_eq!(outcome.failed, vec![id(3)]);
    assert_eq!(
        outcome.partial_failure(),
        Some(EngineError::PartialBatchFailure {
            requested: 5,
            succeeded: 4
        })
    );

    for raw in [1, 2, 4, 5] {
        assert_eq!(engine.boost_of(id(raw)), None);
        assert_eq!(engine.effective_initiative(id(raw)), 10);
    }
    assert_eq!(engine.boost_of(id(3)), Some(WeatherAbility::SwiftSwim));
    assert_eq!(engine.effective_initiative(id(3)), 20);
    assert_eq!(engine.provider().last_value(id(3)), Some(20));

    // The next eligible trigger retries the leftover item only.
    let retry = engine.apply_weather_ability_boost(WeatherAbility::SwiftSwim);
    assert_eq!(retry.restored, vec![id(3)]);
    assert_eq!(engine.provider().last_value(id(3)), Some(10));
}

#[test]
fn test_failed_apply_is_not_recorded() {
    let provider = ScriptedProvider::new().failing_once(id(1));
    let mut engine = engine_with_provider(
        vec![
            weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
            combatant(2, 1, 10),
        ],
        provider,
    );
    let outcomes = engine.set_weather(Weather::Rain);
    assert_eq!(outcomes[0].failed, vec![id(1)]);
    assert_eq!(engine.boost_of(id(1)), None);
    assert_eq!(engine.effective_initiative(id(1)), 10);

    let retry = engine.apply_weather_ability_boost(WeatherAbility::SwiftSwim);
    assert_eq!(retry.applied, vec![id(1)]);
    assert_eq!(engine.effective_initiative(id(1)), 20);
}

#[test]
fn test_slow_batch_cannot_undo_faster_later_batch() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);

    engine.set_weather(Weather::Rain);
    let slow = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let slow_results = submit(&mut engine, &slow);

    engine.set_weather(Weather::Clear);
    let fast = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    assert_eq!(fast.len(), 1);
    let fast_results = submit(&mut engine, &fast);

    let fast_outcome = engine.complete_weather_boost(&fast, &fast_results);
    assert_eq!(fast_outcome.restored, vec![id(1)]);

    // The earlier batch resolves last; its apply must not be recorded.
    let slow_outcome = engine.complete_weather_boost(&slow, &slow_results);
    assert_eq!(slow_outcome.skipped, vec![id(1)]);
    assert_eq!(engine.boost_of(id(1)), None);
    assert_eq!(engine.effective_initiative(id(1)), 10);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));
}

#[test]
fn test_stage_change_during_pending_apply_is_republished() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let apply = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &apply);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));

    engine
        .change_stat(id(1), Stat::Initiative, 2, ChangeSource::Environment)
        .unwrap();
    let outcome = engine.complete_weather_boost(&apply, &results);
    assert_eq!(outcome.applied, vec![id(1)]);

    assert_eq!(engine.effective_initiative(id(1)), 40);
    assert_eq!(engine.provider().last_value(id(1)), Some(40));
}

#[test]
fn test_stage_change_during_pending_restore_is_republished() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let apply = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &apply);
    engine.complete_weather_boost(&apply, &results);

    engine.set_weather(Weather::Clear);
    let restore = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &restore);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));

    engine
        .change_stat(id(1), Stat::Initiative, 2, ChangeSource::Environment)
        .unwrap();
    let outcome = engine.complete_weather_boost(&restore, &results);
    assert_eq!(outcome.restored, vec![id(1)]);

    assert_eq!(engine.effective_initiative(id(1)), 20);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));
}

#[test]
fn test_status_change_during_pending_apply_is_republished() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let apply = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &apply);

    engine
        .set_status(id(1), Some(StatusCondition::Paralysis))
        .unwrap();
    engine.complete_weather_boost(&apply, &results);

    assert_eq!(engine.effective_initiative(id(1)), 10);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));
}

#[test]
fn test_removing_pending_apply_republishes_pre_weather_value() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let apply = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &apply);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));

    assert_eq!(engine.remove_weather_ability_boost(id(1)), Ok(false));
    assert_eq!(engine.provider().last_value(id(1)), Some(10));

    let outcome = engine.complete_weather_boost(&apply, &results);
    assert_eq!(outcome.skipped, vec![id(1)]);
    assert_eq!(engine.boost_of(id(1)), None);
    assert_eq!(engine.effective_initiative(id(1)), 10);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));
}

#[test]
fn test_superseded_batch_submitted_late_is_corrected() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let slow = engine.stage_weather_boost(WeatherAbility::SwiftSwim);

    engine.set_weather(Weather::Clear);
    let fast = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let fast_results = submit(&mut engine, &fast);
    engine.complete_weather_boost(&fast, &fast_results);

    // The older batch reaches the provider after the newer one resolved.
    let slow_results = submit(&mut engine, &slow);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));

    let outcome = engine.complete_weather_boost(&slow, &slow_results);
    assert_eq!(outcome.skipped, vec![id(1)]);
    assert_eq!(engine.effective_initiative(id(1)), 10);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));
}

#[test]
fn test_leaving_cancels_pending_restoration() {
    let mut engine = manual_engine(vec![
        weather_combatant(1, 0, 10, WeatherAbility::SwiftSwim),
        weather_combatant(2, 0, 10, WeatherAbility::SwiftSwim),
        combatant(3, 1, 10),
    ]);
    engine.set_weather(Weather::Rain);
    let apply = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &apply);
    engine.complete_weather_boost(&apply, &results);

    engine.set_weather(Weather::Clear);
    let restore = engine.stage_weather_boost(WeatherAbility::SwiftSwim);
    let results = submit(&mut engine, &restore);
    engine.leave(id(2)).unwrap();

    let outcome = engine.complete_weather_boost(&restore, &results);
    assert_eq!(outcome.restored, vec![id(1)]);
    assert_eq!(outcome.skipped, vec![id(2)]);
    assert_eq!(engine.true_original_initiative(id(2)), None);
}

#[test]
fn test_true_original_survives_toggles_until_leave() {
    let mut engine = swift_swimmer_duel(10);
    engine.set_weather(Weather::Rain);
    engine.set_weather(Weather::Clear);
    assert_eq!(engine.true_original_initiative(id(1)), Some(10));

    engine.leave(id(1)).unwrap();
    assert_eq!(engine.true_original_initiative(id(1)), None);
}

#[test]
fn test_defeated_carriers_are_not_boosted() {
    let mut engine = swift_swimmer_duel(10);
    engine.mark_defeated(id(1)).unwrap();
    let outcomes = engine.set_weather(Weather::Rain);
    assert!(outcomes.iter().all(|o| !o.changed()));
    assert_eq!(engine.boost_of(id(1)), None);
}
