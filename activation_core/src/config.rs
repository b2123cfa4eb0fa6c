//! Configuration for rule databases and action selection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for stochastic action selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Boltzmann temperature; lower is greedier.
    pub temperature: f64,

    /// Seed for reproducible selection. Drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.01,
            seed: None,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "selection.temperature must be positive and finite, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Configuration for rule databases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDbConfig {
    /// Maximum number of conditions per rule; unlimited when absent.
    pub max_conds: Option<usize>,
}

impl RuleDbConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_conds == Some(0) {
            return Err(Error::InvalidConfig(
                "rules.max_conds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level network configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub selection: SelectionConfig,
    pub rules: RuleDbConfig,
}

impl NetworkConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.selection.validate()?;
        self.rules.validate()
    }
}
