//! CLI command implementations for turnstile.

pub(crate) mod batch;
pub(crate) mod replay;
pub(crate) mod run;

mod output;

use std::path::Path;

use clap::ValueEnum;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use turnstile::HostConfig;

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `batch` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BatchFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug, Error)]
#[error("{message}")]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

impl From<turnstile::config::ConfigError> for CliError {
    fn from(e: turnstile::config::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<turnstile::MatchError> for CliError {
    fn from(e: turnstile::MatchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<turnstile::replay::ReplayError> for CliError {
    fn from(e: turnstile::replay::ReplayError) -> Self {
        Self::new(e.to_string())
    }
}

/// Overrides from command-line flags, applied on top of the config file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConfigOverrides {
    pub(crate) seed: Option<u64>,
    pub(crate) turns: Option<u32>,
    pub(crate) budget: Option<u64>,
    pub(crate) units: Option<u32>,
    pub(crate) width: Option<u16>,
    pub(crate) height: Option<u16>,
}

/// Load the config file (or defaults) and apply flag overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the result is invalid.
pub(crate) fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<HostConfig, CliError> {
    let mut config = match path {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };

    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if let Some(turns) = overrides.turns {
        config.max_turns = turns;
    }
    if let Some(budget) = overrides.budget {
        config.turn_budget = budget;
    }
    if let Some(units) = overrides.units {
        config.units = units;
    }
    if let Some(width) = overrides.width {
        config.world_width = width;
    }
    if let Some(height) = overrides.height {
        config.world_height = height;
    }

    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but picks a clock seed when neither a `--seed`
/// flag nor a config file supplies one.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the result is invalid.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    mut overrides: ConfigOverrides,
) -> Result<HostConfig, CliError> {
    if overrides.seed.is_none() && path.is_none() {
        overrides.seed = Some(clock_seed());
    }
    load_config(path, overrides)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `verbose`.
pub(crate) fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Seed from the clock when none was given.
#[allow(clippy::cast_possible_truncation)]
fn clock_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}
