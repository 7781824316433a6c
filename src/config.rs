//! Host configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::{Budget, CostTable, DEFAULT_TURN_BUDGET};

/// Errors loading or validating a [`HostConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The JSON was malformed or had unknown fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Configuration for a host run.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Ticks before the run ends.
    pub max_turns: u32,
    /// Budget granted to each unit per turn.
    pub turn_budget: u64,
    /// Optional wall-clock limit per turn, in milliseconds.
    pub turn_deadline_ms: Option<u64>,
    /// Cost of each host call.
    pub costs: CostTable,
    /// Grid width.
    pub world_width: u16,
    /// Grid height.
    pub world_height: u16,
    /// Units scattered on the grid at start.
    pub units: u32,
    /// Seed for unit placement.
    pub seed: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_turns: 1000,
            turn_budget: DEFAULT_TURN_BUDGET,
            turn_deadline_ms: None,
            costs: CostTable::default(),
            world_width: 32,
            world_height: 32,
            units: 2,
            seed: 0,
        }
    }
}

impl HostConfig {
    /// A fresh budget meter for one turn.
    #[must_use]
    pub fn budget(&self) -> Budget {
        match self.turn_deadline_ms {
            Some(ms) => Budget::with_deadline(self.turn_budget, Duration::from_millis(ms)),
            None => Budget::new(self.turn_budget),
        }
    }

    /// Check that the values describe a runnable match.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1"));
        }
        if self.turn_budget == 0 {
            return Err(ConfigError::Invalid("turn_budget must be at least 1"));
        }
        if self.turn_deadline_ms == Some(0) {
            return Err(ConfigError::Invalid("turn_deadline_ms must be at least 1"));
        }
        if self.world_width == 0 || self.world_height == 0 {
            return Err(ConfigError::Invalid("world dimensions must be non-zero"));
        }
        let cells = u64::from(self.world_width) * u64::from(self.world_height);
        if u64::from(self.units) > cells {
            return Err(ConfigError::Invalid("more units than grid cells"));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
