// integration tests for the condition engine through the public library API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use barcond::bars::Bar;
use barcond::conditions::{
    builtin_conditions, builtin_registry, CachePolicy, Condition, ConditionArg, ConditionEngine,
    ConditionRef, ConditionSet, Operator, RegistryError, CONDITION_SET_ID,
};
use barcond::config;
use barcond::state::{flags, StateSnapshot};

fn engine(sets: Vec<ConditionSet>) -> ConditionEngine {
    ConditionEngine::new(builtin_registry(), CachePolicy::default()).with_condition_sets(sets)
}

fn out_of_combat() -> ConditionSet {
    ConditionSet::new("Out of Combat")
        .with(ConditionRef::new("cf", flags::IN_COMBAT as i64).negated())
}

fn cities() -> ConditionSet {
    ConditionSet::new("Cities")
        .with(ConditionRef::new("z", 100i64))
        .with(ConditionRef::new("z", 200i64).with_operator(Operator::Or))
        .with(ConditionRef::new("z", 300i64).with_operator(Operator::Or))
}

#[test]
fn test_out_of_combat_set() {
    let engine = engine(vec![out_of_combat()]);

    assert!(engine.check_condition_set_index(0, &StateSnapshot::new()));

    engine.set_run_time(1.0);
    let fighting = StateSnapshot::new().with_flag(flags::IN_COMBAT);
    assert!(!engine.check_condition_set_index(0, &fighting));
}

#[test]
fn test_zone_set() {
    let set = cities();
    let engine = ConditionEngine::new(builtin_registry(), CachePolicy::disabled());

    for zone in [100, 200, 300] {
        assert!(
            engine.check_condition_set(&set, &StateSnapshot::new().with_zone(zone)),
            "zone {}",
            zone
        );
    }
    for zone in [0, 99, 400] {
        assert!(
            !engine.check_condition_set(&set, &StateSnapshot::new().with_zone(zone)),
            "zone {}",
            zone
        );
    }
}

#[test]
fn test_imported_set_with_unknown_ids_degrades() {
    let json = r#"{
        "name": "From a newer version",
        "conditions": [
            { "id": "future_thing", "arg": { "string": "x" } },
            { "id": "cf", "arg": { "int": 26 }, "negate": true, "operator": "and" },
            { "id": "another_new_one", "operator": "xor" }
        ]
    }"#;
    let set: ConditionSet = serde_json::from_str(json).unwrap();
    let engine = engine(vec![set.clone()]);

    assert!(engine.check_condition_set(&set, &StateSnapshot::new()));
    assert_eq!(engine.validate_set(&set).len(), 2);
}

#[test]
fn test_cache_window_hides_state_changes_until_it_elapses() {
    let engine = engine(vec![out_of_combat()]);
    let calm = StateSnapshot::new();
    let fighting = StateSnapshot::new().with_flag(flags::IN_COMBAT);

    engine.set_run_time(10.0);
    assert!(engine.check_condition_set_index(0, &calm));

    // same frame window: the memoized result stands
    engine.set_run_time(10.05);
    assert!(engine.check_condition_set_index(0, &fighting));

    engine.set_run_time(10.2);
    assert!(!engine.check_condition_set_index(0, &fighting));
}

#[test]
fn test_host_conditions_extend_the_builtin_table() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = builtin_conditions()
        .condition(Condition::new(
            "counter",
            "Counter",
            "misc",
            10,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            },
        ))
        .build()
        .unwrap();
    let engine = ConditionEngine::new(Arc::new(registry), CachePolicy::disabled());
    let state = StateSnapshot::new();

    for _ in 0..3 {
        assert!(engine.check_condition("counter", &ConditionArg::None, &state));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_duplicate_builtin_id_is_rejected() {
    let result = builtin_conditions()
        .condition(Condition::new("z", "Other Zone", "location", 5, |_, _| false))
        .build();
    assert!(matches!(
        result,
        Err(RegistryError::DuplicateCondition { ref id, .. }) if id == "z"
    ));
}

#[test]
fn test_self_referencing_set_is_false_first_time() {
    let looped = ConditionSet::new("Loop").with(ConditionRef::new(CONDITION_SET_ID, 0i64));
    let engine = engine(vec![looped]);
    assert!(!engine.check_condition_set_index(0, &StateSnapshot::new()));
}

#[test]
fn test_bars_follow_their_sets_after_edits() {
    let mut config = config::Config {
        condition_sets: vec![cities(), out_of_combat()],
        bars: vec![Bar::new("Combat").with_condition_set(1)],
        ..Default::default()
    };

    config::remove_condition_set(&mut config, 0).unwrap();
    assert_eq!(config.bars[0].condition_set, Some(0));

    let engine = config::engine_from_config(&config, builtin_registry());
    let fighting = StateSnapshot::new().with_flag(flags::IN_COMBAT);
    assert!(!config.bars[0].is_visible(&engine, &fighting));
}
