//! Scenario files: a fighter, an encounter, strategy overrides and trinkets in one YAML
//! (or JSON) document.
//!
//! ```yaml
//! fighter:
//!   attack_power: 2900
//!   crit_chance: 0.36
//! encounter:
//!   fight_length: 180
//!   debuffs: [faerie_fire, improved_expose_armor, blood_frenzy]
//! strategy:
//!   finisher: rip
//!   use_rip_trick: true
//! trinkets:
//!   - bloodlust_brooch
//!   - dragonspine_trophy
//! replicates: 2000
//! seed: 7
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::combat::engine::Simulation;
use crate::combat::fighter::FighterConfig;
use crate::combat::trinket::TrinketConfig;
use crate::data::encounter::{EncounterParams, DEFAULT_BOSS_ARMOR, DEFAULT_FIGHT_LENGTH};
use crate::data::presets;
use crate::error::{ConfigError, ScenarioError};

pub const DEFAULT_SCENARIO_PATH: &str = "data/scenarios/default.yaml";
pub const DEFAULT_REPLICATES: usize = 1000;
pub const DEFAULT_SEED: u64 = 1;

fn default_fight_length() -> f64 {
    DEFAULT_FIGHT_LENGTH
}

fn default_boss_armor() -> f64 {
    DEFAULT_BOSS_ARMOR
}

fn default_replicates() -> usize {
    DEFAULT_REPLICATES
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioEncounter {
    #[serde(default = "default_fight_length")]
    pub fight_length: f64,
    #[serde(default = "default_boss_armor")]
    pub boss_armor: f64,
    /// Active debuff names. Absent means the default raid debuffs.
    #[serde(default)]
    pub debuffs: Option<Vec<String>>,
}

impl Default for ScenarioEncounter {
    fn default() -> Self {
        Self {
            fight_length: DEFAULT_FIGHT_LENGTH,
            boss_armor: DEFAULT_BOSS_ARMOR,
            debuffs: None,
        }
    }
}

/// A preset name or a fully specified trinket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrinketSpec {
    Preset(String),
    Custom(TrinketConfig),
}

/// Misspelled keys are parse errors rather than silently defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub fighter: FighterConfig,
    #[serde(default)]
    pub encounter: ScenarioEncounter,
    #[serde(default)]
    pub strategy: Map<String, Value>,
    #[serde(default)]
    pub trinkets: Vec<TrinketSpec>,
    #[serde(default = "default_replicates")]
    pub replicates: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Also weigh mana pool, spirit, mp5 and intellect.
    #[serde(default)]
    pub include_mana_stats: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            fighter: FighterConfig::default(),
            encounter: ScenarioEncounter::default(),
            strategy: Map::new(),
            trinkets: Vec::new(),
            replicates: DEFAULT_REPLICATES,
            seed: DEFAULT_SEED,
            include_mana_stats: false,
        }
    }
}

impl Scenario {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Resolves trinket presets (folding their passive stats into the fighter) and
    /// validates everything into a runnable simulation.
    pub fn build(&self) -> Result<Simulation, ConfigError> {
        let mut fighter = self.fighter.clone();
        let mut trinkets = Vec::with_capacity(self.trinkets.len());
        for spec in &self.trinkets {
            match spec {
                TrinketSpec::Preset(name) => {
                    trinkets.extend(presets::equip(&mut fighter, std::slice::from_ref(name))?);
                }
                TrinketSpec::Custom(config) => trinkets.push(config.clone()),
            }
        }

        let encounter = EncounterParams::new(self.encounter.fight_length).with_boss_armor(self.encounter.boss_armor);
        let mut builder = Simulation::builder(fighter)
            .encounter(encounter)
            .strategy_overrides(self.strategy.clone())
            .trinkets(trinkets);
        if let Some(names) = &self.encounter.debuffs {
            builder = builder.debuffs(names);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::strategy::Finisher;

    #[test]
    fn empty_document_uses_defaults() {
        let scenario = Scenario::from_yaml_str("{}").unwrap();
        assert_eq!(scenario, Scenario::default());
        let sim = scenario.build().unwrap();
        assert_eq!(sim.fight_length(), DEFAULT_FIGHT_LENGTH);
    }

    #[test]
    fn presets_and_custom_trinkets_mix() {
        let scenario = Scenario::from_yaml_str(
            r#"
fighter:
  attack_power: 3000
encounter:
  fight_length: 120
  debuffs: [faerie_fire]
strategy:
  finisher: bite
trinkets:
  - bloodlust_brooch
  - name: test_charm
    proc_name: Test Buff
    effects: [{stat: attack_power, amount: 100}]
    duration: 10
    cooldown: 30
    behavior: {type: proc, trigger: {rate: {kind: chance, on_hit: 0.5, on_crit: 0.5}}}
replicates: 50
seed: 9
"#,
        )
        .unwrap();
        assert_eq!(scenario.replicates, 50);
        let sim = scenario.build().unwrap();
        assert_eq!(sim.fighter().attack_power, 3072.0);
        assert_eq!(sim.trinkets().len(), 2);
        assert_eq!(sim.strategy().finisher, Finisher::Bite);
        assert_eq!(sim.encounter().debuffs.active_names(), vec!["faerie_fire"]);
    }

    #[test]
    fn misspelled_keys_fail_to_parse() {
        for raw in [
            "fighter:\n  atack_power: 3000\n",
            "encounter:\n  fight_lenght: 60\n",
            "replicate: 50\n",
        ] {
            let err = Scenario::from_yaml_str(raw).unwrap_err();
            assert!(matches!(err, ScenarioError::Parse(_)), "{raw}");
        }
    }

    #[test]
    fn invalid_names_surface_as_config_errors() {
        let scenario = Scenario::from_yaml_str("encounter: {debuffs: [moonfire]}").unwrap();
        assert!(matches!(scenario.build(), Err(ConfigError::UnknownDebuffs { .. })));
        let scenario = Scenario::from_yaml_str("strategy: {turbo: true}").unwrap();
        assert!(matches!(scenario.build(), Err(ConfigError::UnknownStrategyKeys { .. })));
        let scenario = Scenario::from_yaml_str("trinkets: [lucky_coin]").unwrap();
        assert!(matches!(scenario.build(), Err(ConfigError::UnknownTrinketPreset { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        match Scenario::load("no/such/scenario.yaml") {
            Err(ScenarioError::Io { path, .. }) => assert!(path.contains("scenario.yaml")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
