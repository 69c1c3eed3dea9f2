use catsim::combat::{FighterConfig, Simulation};
use catsim::data::{Finisher, Scenario, StrategyConfig, STRATEGY_KEYS};
use catsim::{ConfigError, ScenarioError};
use serde_json::{json, Map, Value};

fn overrides(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn unknown_debuffs_are_all_reported_with_the_valid_set() {
    let err = Simulation::builder(FighterConfig::default())
        .debuffs(&["faerie_fire", "mortal_strike", "thunder_clap"])
        .build()
        .unwrap_err();
    let (invalid, valid) = match err {
        ConfigError::UnknownDebuffs { invalid, valid } => (invalid, valid),
        other => panic!("expected UnknownDebuffs, got {other:?}"),
    };
    assert_eq!(invalid, vec!["mortal_strike", "thunder_clap"]);
    assert!(valid.iter().any(|v| v == "faerie_fire"));
    assert_eq!(valid.len(), 7);
}

#[test]
fn unknown_strategy_keys_are_all_reported_with_the_valid_set() {
    let err = Simulation::builder(FighterConfig::default())
        .strategy_overrides(overrides(json!({ "finisher": "bite", "turbo": true, "zerg": 1 })))
        .build()
        .unwrap_err();
    let (mut invalid, valid) = match err {
        ConfigError::UnknownStrategyKeys { invalid, valid } => (invalid, valid),
        other => panic!("expected UnknownStrategyKeys, got {other:?}"),
    };
    invalid.sort();
    assert_eq!(invalid, vec!["turbo", "zerg"]);
    assert_eq!(valid.len(), STRATEGY_KEYS.len());
}

#[test]
fn strategy_values_are_type_checked() {
    let err = Simulation::builder(FighterConfig::default())
        .strategy_overrides(overrides(json!({ "min_combos_for_rip": 9 })))
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStrategyValue { ref key, .. } if key == "min_combos_for_rip"));

    let sim = Simulation::builder(FighterConfig::default())
        .strategy_overrides(overrides(json!({ "finisher": "bite", "min_combos_for_bite": 4 })))
        .build()
        .unwrap();
    assert_eq!(sim.strategy().finisher, Finisher::Bite);
    assert_eq!(sim.strategy().min_combos_for_bite, 4);
}

#[test]
fn directly_supplied_strategy_is_range_checked() {
    let err = Simulation::builder(FighterConfig::default())
        .strategy(StrategyConfig {
            min_combos_for_rip: 0,
            cd_delay: -5.0,
            max_wait_time: -1.0,
            ..StrategyConfig::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStrategyValue { ref key, .. } if key == "min_combos_for_rip"));

    let err = Simulation::builder(FighterConfig::default())
        .strategy(StrategyConfig {
            max_wait_time: -1.0,
            ..StrategyConfig::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStrategyValue { ref key, .. } if key == "max_wait_time"));

    let sim = Simulation::builder(FighterConfig::default())
        .strategy(StrategyConfig {
            finisher: Finisher::Bite,
            ..StrategyConfig::default()
        })
        .build()
        .unwrap();
    assert_eq!(sim.strategy().finisher, Finisher::Bite);
    assert_eq!(sim.strategy().min_combos_for_rip, 4);
}

#[test]
fn invalid_fighter_and_encounter_values_are_rejected() {
    let err = Simulation::builder(FighterConfig {
        swing_timer: 0.0,
        ..FighterConfig::default()
    })
    .build()
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameter { ref field, .. } if field == "swing_timer"));

    assert!(Simulation::builder(FighterConfig::default())
        .fight_length(-3.0)
        .build()
        .is_err());
    assert!(Simulation::builder(FighterConfig {
        savage_fury: 3,
        ..FighterConfig::default()
    })
    .build()
    .is_err());
}

#[test]
fn perturbation_restores_attack_power_exactly() {
    let mut sim = Simulation::builder(FighterConfig {
        attack_power: 2873.3,
        ..FighterConfig::default()
    })
    .build()
    .unwrap();
    let original = sim.clone();
    {
        let perturbed = sim.perturb(|f| f.attack_power += 80.0);
        assert_eq!(perturbed.fighter().attack_power, 2873.3 + 80.0);
    }
    assert_eq!(sim.fighter().attack_power.to_bits(), 2873.3_f64.to_bits());
    assert_eq!(sim, original);
}

#[test]
fn bundled_scenarios_load_and_build() {
    for path in ["data/scenarios/default.yaml", "data/scenarios/trick_rotation.yaml"] {
        let scenario = Scenario::load(path).unwrap();
        let sim = scenario.build().unwrap();
        assert!(sim.fight_length() > 0.0, "{path}");
        assert!(!sim.trinkets().is_empty(), "{path}");
    }
}

#[test]
fn missing_scenario_file_names_the_path() {
    let err = Scenario::load("data/scenarios/does_not_exist.yaml").unwrap_err();
    assert!(matches!(err, ScenarioError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.yaml"));
}

#[test]
fn misspelled_fighter_field_is_a_parse_error() {
    let err = Scenario::from_yaml_str("fighter:\n  atack_power: 3000\n").unwrap_err();
    assert!(matches!(err, ScenarioError::Parse(_)));
    assert!(err.to_string().contains("atack_power"));
}

#[test]
fn unknown_preset_in_a_scenario_fails_to_build() {
    let scenario = Scenario::from_yaml_str("trinkets: [bloodlust_brooch, lucky_rabbit_foot]\n").unwrap();
    let err = scenario.build().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTrinketPreset { ref name, .. } if name == "lucky_rabbit_foot"));
}
