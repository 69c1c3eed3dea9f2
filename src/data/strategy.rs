//! Rotation strategy knobs and their allow-list validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finisher {
    Rip,
    Bite,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builder {
    Shred,
    Claw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub finisher: Finisher,
    pub min_combos_for_rip: u8,
    pub min_combos_for_bite: u8,
    pub default_builder: Builder,
    /// Shift out and back for energy when low. Off means the no-shift rotation.
    pub powershift: bool,
    pub use_innervate: bool,
    pub prepop_tf: bool,
    /// Energy ticks Tiger's Fury is expected to overlap before the pull (0-2).
    pub prepop_numticks: u8,
    /// Mangle at 40-41 energy instead of waiting on a Shred.
    pub use_mangle_trick: bool,
    /// Bite with few combo points when energy sits in `35..=bite_trick_max` under Rip.
    pub use_bite_trick: bool,
    pub bite_trick_cp: u8,
    pub bite_trick_max: f64,
    /// Rip early at `rip_trick_cp` combo points once energy reaches `rip_trick_min`.
    pub use_rip_trick: bool,
    pub rip_trick_cp: u8,
    pub rip_trick_min: f64,
    /// Weave Ferocious Bite in while Rip has at least `bite_time` seconds left.
    pub use_biteweave: bool,
    pub bite_time: f64,
    /// Longest wait for an energy tick before shifting instead; zero always waits.
    pub max_wait_time: f64,
    /// Extra delay before the first on-use trinket.
    pub cd_delay: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            finisher: Finisher::Rip,
            min_combos_for_rip: 4,
            min_combos_for_bite: 5,
            default_builder: Builder::Shred,
            powershift: true,
            use_innervate: true,
            prepop_tf: false,
            prepop_numticks: 2,
            use_mangle_trick: false,
            use_bite_trick: false,
            bite_trick_cp: 2,
            bite_trick_max: 39.0,
            use_rip_trick: false,
            rip_trick_cp: 4,
            rip_trick_min: 52.0,
            use_biteweave: false,
            bite_time: 10.0,
            max_wait_time: 0.0,
            cd_delay: 0.0,
        }
    }
}

pub const STRATEGY_KEYS: [&str; 19] = [
    "finisher",
    "min_combos_for_rip",
    "min_combos_for_bite",
    "default_builder",
    "powershift",
    "use_innervate",
    "prepop_tf",
    "prepop_numticks",
    "use_mangle_trick",
    "use_bite_trick",
    "bite_trick_cp",
    "bite_trick_max",
    "use_rip_trick",
    "rip_trick_cp",
    "rip_trick_min",
    "use_biteweave",
    "bite_time",
    "max_wait_time",
    "cd_delay",
];

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidStrategyValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn as_bool(key: &str, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| invalid(key, format!("expected a boolean, got {value}")))
}

fn as_count(key: &str, value: &Value) -> Result<u8, ConfigError> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| invalid(key, format!("expected a small non-negative integer, got {value}")))
}

fn as_seconds(key: &str, value: &Value) -> Result<f64, ConfigError> {
    value.as_f64().ok_or_else(|| invalid(key, format!("expected a number, got {value}")))
}

fn check_count(key: &str, n: u8, min: u8, max: u8) -> Result<(), ConfigError> {
    if (min..=max).contains(&n) {
        Ok(())
    } else {
        Err(invalid(key, format!("expected an integer in {min}..={max}, got {n}")))
    }
}

fn check_seconds(key: &str, x: f64) -> Result<(), ConfigError> {
    if x.is_finite() && x >= 0.0 {
        Ok(())
    } else {
        Err(invalid(key, format!("expected a non-negative number, got {x}")))
    }
}

fn as_enum<T: for<'de> Deserialize<'de>>(key: &str, value: &Value, choices: &str) -> Result<T, ConfigError> {
    serde_json::from_value(value.clone())
        .map_err(|_| invalid(key, format!("expected one of {choices}, got {value}")))
}

impl StrategyConfig {
    /// Defaults overridden by `overrides`. Every unrecognized key is reported at once,
    /// before any value is checked.
    pub fn from_map(overrides: &Map<String, Value>) -> Result<Self, ConfigError> {
        let unknown: Vec<String> = overrides
            .keys()
            .filter(|k| !STRATEGY_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            warn!(keys = ?unknown, "rejecting unknown strategy parameters");
            return Err(ConfigError::UnknownStrategyKeys {
                invalid: unknown,
                valid: STRATEGY_KEYS.iter().map(|k| k.to_string()).collect(),
            });
        }

        let mut config = Self::default();
        for (key, value) in overrides {
            let k = key.as_str();
            match k {
                "finisher" => config.finisher = as_enum(k, value, "rip, bite, none")?,
                "min_combos_for_rip" => config.min_combos_for_rip = as_count(k, value)?,
                "min_combos_for_bite" => config.min_combos_for_bite = as_count(k, value)?,
                "default_builder" => config.default_builder = as_enum(k, value, "shred, claw")?,
                "powershift" => config.powershift = as_bool(k, value)?,
                "use_innervate" => config.use_innervate = as_bool(k, value)?,
                "prepop_tf" => config.prepop_tf = as_bool(k, value)?,
                "prepop_numticks" => config.prepop_numticks = as_count(k, value)?,
                "use_mangle_trick" => config.use_mangle_trick = as_bool(k, value)?,
                "use_bite_trick" => config.use_bite_trick = as_bool(k, value)?,
                "bite_trick_cp" => config.bite_trick_cp = as_count(k, value)?,
                "bite_trick_max" => config.bite_trick_max = as_seconds(k, value)?,
                "use_rip_trick" => config.use_rip_trick = as_bool(k, value)?,
                "rip_trick_cp" => config.rip_trick_cp = as_count(k, value)?,
                "rip_trick_min" => config.rip_trick_min = as_seconds(k, value)?,
                "use_biteweave" => config.use_biteweave = as_bool(k, value)?,
                "bite_time" => config.bite_time = as_seconds(k, value)?,
                "max_wait_time" => config.max_wait_time = as_seconds(k, value)?,
                "cd_delay" => config.cd_delay = as_seconds(k, value)?,
                other => return Err(invalid(other, "unrecognized parameter")),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Range checks shared by overrides and directly constructed configs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_count("min_combos_for_rip", self.min_combos_for_rip, 1, 5)?;
        check_count("min_combos_for_bite", self.min_combos_for_bite, 1, 5)?;
        check_count("prepop_numticks", self.prepop_numticks, 0, 2)?;
        check_count("bite_trick_cp", self.bite_trick_cp, 1, 5)?;
        check_count("rip_trick_cp", self.rip_trick_cp, 1, 5)?;
        check_seconds("bite_trick_max", self.bite_trick_max)?;
        check_seconds("rip_trick_min", self.rip_trick_min)?;
        check_seconds("bite_time", self.bite_time)?;
        check_seconds("max_wait_time", self.max_wait_time)?;
        check_seconds("cd_delay", self.cd_delay)?;
        Ok(())
    }

    pub fn builder_cost(&self) -> f64 {
        match self.default_builder {
            Builder::Shred => crate::combat::fighter::SHRED_COST,
            Builder::Claw => crate::combat::fighter::CLAW_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_map_gives_defaults() {
        assert_eq!(StrategyConfig::from_map(&Map::new()).unwrap(), StrategyConfig::default());
    }

    #[test]
    fn rip_waits_for_four_combo_points_by_default() {
        let config = StrategyConfig::default();
        assert_eq!(config.min_combos_for_rip, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_directly_built_configs() {
        let config = StrategyConfig {
            min_combos_for_rip: 0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStrategyValue { ref key, .. }) if key == "min_combos_for_rip"
        ));

        let config = StrategyConfig {
            cd_delay: -5.0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStrategyValue { ref key, .. }) if key == "cd_delay"
        ));

        let config = StrategyConfig {
            bite_time: f64::NAN,
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let config = StrategyConfig::from_map(&map(json!({
            "finisher": "bite",
            "min_combos_for_bite": 4,
            "default_builder": "claw",
            "powershift": false,
            "max_wait_time": 0.5
        })))
        .unwrap();
        assert_eq!(config.finisher, Finisher::Bite);
        assert_eq!(config.min_combos_for_bite, 4);
        assert_eq!(config.default_builder, Builder::Claw);
        assert!(!config.powershift);
        assert_eq!(config.max_wait_time, 0.5);
        assert_eq!(config.builder_cost(), 40.0);
    }

    #[test]
    fn unknown_keys_list_all_invalid_and_valid() {
        let err = StrategyConfig::from_map(&map(json!({
            "finisher": "rip",
            "turbo": true,
            "min_combos": 3
        })))
        .unwrap_err();
        match err {
            ConfigError::UnknownStrategyKeys { invalid, valid } => {
                assert_eq!(invalid.len(), 2);
                assert!(invalid.contains(&"turbo".to_string()));
                assert!(invalid.contains(&"min_combos".to_string()));
                assert_eq!(valid.len(), STRATEGY_KEYS.len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_values_are_rejected() {
        for bad in [
            json!({"min_combos_for_rip": 6}),
            json!({"prepop_numticks": 3}),
            json!({"finisher": "shred"}),
            json!({"powershift": "yes"}),
            json!({"cd_delay": -1.0}),
            json!({"bite_trick_cp": 300}),
        ] {
            let err = StrategyConfig::from_map(&map(bad.clone())).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidStrategyValue { .. }), "{bad}");
        }
    }
}
