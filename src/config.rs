// ⚙️ Console Configuration - JSON file with serde defaults
// Every field is optional; a missing file section falls back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConsoleError;
use crate::grouping::{GroupingStrategy, HouseGroupingEngine};
use crate::residents::DEFAULT_RESIDENT_ROLE;

/// Environment variable the binaries read to locate the config file
pub const CONFIG_ENV_VAR: &str = "RESIDENTIAL_CONSOLE_CONFIG";

/// Label for feed rows whose residential entity is not in the registry
pub const DEFAULT_UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    #[serde(default)]
    pub strategy: GroupingStrategy,

    #[serde(default = "default_resident_role")]
    pub resident_role: String,
}

fn default_resident_role() -> String {
    DEFAULT_RESIDENT_ROLE.to_string()
}

impl Default for GroupingConfig {
    fn default() -> Self {
        GroupingConfig {
            strategy: GroupingStrategy::default(),
            resident_role: default_resident_role(),
        }
    }
}

impl GroupingConfig {
    pub fn engine(&self) -> HouseGroupingEngine {
        let mut engine = HouseGroupingEngine::with_strategy(self.strategy);
        engine.resident_role = self.resident_role.clone();
        engine
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
}

fn default_unknown_label() -> String {
    DEFAULT_UNKNOWN_LABEL.to_string()
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            unknown_label: default_unknown_label(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub grouping: GroupingConfig,

    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

impl ConsoleConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ConsoleConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Config from the file named by `RESIDENTIAL_CONSOLE_CONFIG`, else defaults
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => {
                tracing::info!(path = %path, "loading console config");
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.grouping.resident_role.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig(
                "grouping.resident_role must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
