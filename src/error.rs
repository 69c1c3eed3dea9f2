use thiserror::Error;

/// Rejected simulation input. Raised while building a [`crate::combat::Simulation`],
/// never during a trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported debuffs {invalid:?}; supported debuffs are {valid:?}")]
    UnknownDebuffs {
        invalid: Vec<String>,
        valid: Vec<String>,
    },
    #[error("unsupported strategy parameters {invalid:?}; supported parameters are {valid:?}")]
    UnknownStrategyKeys {
        invalid: Vec<String>,
        valid: Vec<String>,
    },
    #[error("invalid value for strategy parameter `{key}`: {message}")]
    InvalidStrategyValue { key: String, message: String },
    #[error("invalid `{field}`: {message}")]
    InvalidParameter { field: String, message: String },
    #[error("unknown trinket preset `{name}`; known presets are {valid:?}")]
    UnknownTrinketPreset { name: String, valid: Vec<String> },
}

impl ConfigError {
    pub fn invalid_parameter(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Failure loading a scenario file into a runnable simulation.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
