//! Double-turn qualification, the turn counter and the round driver.

use proptest::prelude::*;
use tactics_core::double_turn::qualifies;
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{combatant, duel, engine_with, id, TestEngine};
use tactics_test_utils::strategies::arb_initiative;

/// Resolve the rest of the current round, returning the acting order.
fn play_round(engine: &mut TestEngine) -> Vec<TurnSlot> {
    let mut acted = Vec::new();
    while let Some(slot) = engine.next_turn() {
        engine.end_turn(slot.id).unwrap();
        acted.push(slot);
    }
    acted
}

#[test]
fn test_threshold_at_fastest_enemy_five() {
    let below = duel(11, 5);
    assert!(!below.has_double_turns(id(1)));

    let above = duel(12, 5);
    assert!(above.has_double_turns(id(1)));
    assert!(!above.has_double_turns(id(2)));
}

#[test]
fn test_second_turn_only_at_count_one() {
    let mut engine = duel(12, 5);
    assert!(!engine.should_get_second_turn(id(1)));

    assert_eq!(engine.mark_turn_taken(id(1)), 1);
    assert!(engine.should_get_second_turn(id(1)));

    assert_eq!(engine.mark_turn_taken(id(1)), 2);
    assert!(!engine.should_get_second_turn(id(1)));

    engine.reset_round_counters();
    assert_eq!(engine.turns_taken(id(1)), 0);
    assert!(engine.has_double_turns(id(1)));
}

#[test]
fn test_non_qualifier_never_gets_second_turn() {
    let mut engine = duel(12, 5);
    engine.mark_turn_taken(id(2));
    assert!(!engine.should_get_second_turn(id(2)));
}

#[test]
fn test_regular_slot_skipped_once_combatant_has_acted() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 12),
        combatant(2, 1, 5),
        combatant(3, 1, 4),
    ]);
    engine.begin_round();
    // #2 acts out of order before its snapshot slot comes up.
    engine.end_turn(id(2)).unwrap();

    let order: Vec<_> = play_round(&mut engine)
        .iter()
        .map(|s| (s.id, s.kind))
        .collect();
    assert_eq!(
        order,
        vec![
            (id(1), SlotKind::Regular),
            (id(3), SlotKind::Regular),
            (id(1), SlotKind::Bonus),
        ]
    );
    assert_eq!(engine.turns_taken(id(2)), 1);
}

#[test]
fn test_two_team_cycle_across_rounds() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 12),
        combatant(2, 1, 5),
        combatant(3, 1, 4),
    ]);

    for round in 1..=3 {
        assert_eq!(engine.begin_round(), round);

        let first = engine.next_turn().unwrap();
        assert_eq!(first, TurnSlot { id: id(1), kind: SlotKind::Regular });
        engine.end_turn(id(1)).unwrap();
        assert!(engine.should_get_second_turn(id(1)));

        let rest = play_round(&mut engine);
        let order: Vec<_> = rest.iter().map(|s| (s.id, s.kind)).collect();
        assert_eq!(
            order,
            vec![
                (id(2), SlotKind::Regular),
                (id(3), SlotKind::Regular),
                (id(1), SlotKind::Bonus),
            ]
        );
        assert!(!engine.should_get_second_turn(id(1)));
        assert_eq!(engine.turns_taken(id(1)), 2);
    }
}

#[test]
fn test_snapshot_order_is_not_reordered_by_later_changes() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 9),
        combatant(2, 1, 8),
        combatant(3, 1, 7),
    ]);
    engine.begin_round();
    let first = engine.next_turn().unwrap();
    assert_eq!(first.id, id(1));
    engine.end_turn(id(1)).unwrap();

    // #3 becomes the fastest, but the round snapshot stands.
    engine
        .change_stat(id(3), Stat::Initiative, 1, ChangeSource::Environment)
        .unwrap();
    let rest: Vec<_> = play_round(&mut engine).iter().map(|s| s.id).collect();
    assert_eq!(rest, vec![id(2), id(3)]);
}

#[test]
fn test_mid_round_spike_grants_immediate_turn() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 10),
        combatant(2, 1, 8),
        combatant(3, 1, 6),
    ]);
    engine.begin_round();
    let first = engine.next_turn().unwrap();
    assert_eq!(first.id, id(1));
    engine.end_turn(id(1)).unwrap();
    assert!(!engine.has_double_turns(id(1)));

    // #1 buffs itself far past its opponents after acting once.
    engine
        .change_stat(id(1), Stat::Initiative, 2, ChangeSource::Combatant(id(1)))
        .unwrap();
    assert!(engine.has_double_turns(id(1)));
    assert_eq!(engine.provider().immediate_turns, vec![id(1)]);

    let next = engine.next_turn().unwrap();
    assert_eq!(next, TurnSlot { id: id(1), kind: SlotKind::Immediate });
    engine.end_turn(id(1)).unwrap();

    let rest: Vec<_> = play_round(&mut engine).iter().map(|s| s.id).collect();
    assert_eq!(rest, vec![id(2), id(3)]);
}

#[test]
fn test_gaining_before_acting_is_not_immediate() {
    let mut engine = engine_with(vec![combatant(1, 0, 8), combatant(2, 1, 10)]);
    engine.begin_round();
    let first = engine.next_turn().unwrap();
    assert_eq!(first.id, id(2));

    // #1 speeds up before its first action.
    engine
        .change_stat(id(1), Stat::Initiative, 6, ChangeSource::Environment)
        .unwrap();
    assert!(engine.has_double_turns(id(1)));
    assert!(engine.provider().immediate_turns.is_empty());

    engine.end_turn(id(2)).unwrap();
    let rest: Vec<_> = play_round(&mut engine).iter().map(|s| (s.id, s.kind)).collect();
    assert_eq!(
        rest,
        vec![(id(1), SlotKind::Regular), (id(1), SlotKind::Bonus)]
    );
}

#[test]
fn test_losing_qualification_cancels_queued_bonus() {
    let mut engine = duel(12, 5);
    engine.begin_round();
    assert_eq!(engine.next_turn().unwrap().id, id(1));
    engine.end_turn(id(1)).unwrap();

    // The enemy speeds up before the bonus action comes around.
    engine
        .change_stat(id(2), Stat::Initiative, 1, ChangeSource::Environment)
        .unwrap();
    assert!(!engine.has_double_turns(id(1)));

    let rest: Vec<_> = play_round(&mut engine).iter().map(|s| s.kind).collect();
    assert_eq!(rest, vec![SlotKind::Regular]);
}

#[test]
fn test_defeated_combatants_are_skipped() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 9),
        combatant(2, 1, 8),
        combatant(3, 1, 7),
    ]);
    engine.begin_round();
    engine.next_turn().unwrap();
    engine.end_turn(id(1)).unwrap();
    engine.mark_defeated(id(2)).unwrap();

    let rest: Vec<_> = play_round(&mut engine).iter().map(|s| s.id).collect();
    assert_eq!(rest, vec![id(3)]);
}

#[test]
fn test_battle_end_clears_battle_scoped_state() {
    let mut engine = duel(12, 5);
    engine.begin_round();
    play_round(&mut engine);
    engine
        .change_stat(id(1), Stat::Attack, 2, ChangeSource::Environment)
        .unwrap();

    engine.reset_all_modifiers(true);
    assert!(engine.double_turn_set().is_empty());
    assert_eq!(engine.turns_taken(id(1)), 0);
    assert_eq!(engine.round(), 0);
    assert_eq!(engine.current_stage(id(1), Stat::Attack), Ok(0));
    assert!(engine.baseline(id(1)).is_none());
}

#[test]
fn test_round_reset_keeps_boosts() {
    let mut engine = engine_with(vec![
        combatant(1, 0, 10).with_capability(Capability::Weather(WeatherAbility::SlushRush)),
        combatant(2, 1, 10),
    ]);
    engine.set_weather(Weather::Snow);
    engine
        .change_stat(id(1), Stat::Initiative, 1, ChangeSource::Environment)
        .unwrap();
    assert_eq!(engine.effective_initiative(id(1)), 30);

    engine.reset_all_modifiers(false);
    assert_eq!(engine.boost_of(id(1)), Some(WeatherAbility::SlushRush));
    assert_eq!(engine.effective_initiative(id(1)), 20);
    assert_eq!(engine.provider().last_value(id(1)), Some(20));

    engine.reset_all_modifiers(true);
    assert_eq!(engine.boost_of(id(1)), None);
    assert_eq!(engine.effective_initiative(id(1)), 10);
    assert_eq!(engine.provider().last_value(id(1)), Some(10));
}

proptest! {
    #[test]
    fn prop_qualification_matches_threshold(ally in arb_initiative(), enemy in arb_initiative()) {
        let engine = duel(ally, enemy);
        prop_assert_eq!(engine.has_double_turns(id(1)), qualifies(ally, enemy, 2));
        prop_assert_eq!(engine.has_double_turns(id(1)), ally / 2 > enemy);
        // Both sides can never qualify against each other.
        prop_assert!(!(engine.has_double_turns(id(1)) && engine.has_double_turns(id(2))));
    }
}
