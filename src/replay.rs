//! Recorded runs.
//!
//! A [`Recording`] holds the configuration of a run plus every
//! [`TurnRecord`] the host produced, so a run can be inspected after the
//! fact without re-executing agents. Recordings are stored as JSON.

mod text;

pub use text::render_text;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::HostConfig;
use crate::context::LogEntry;
use crate::host::TurnRecord;
use crate::unit::UnitId;

/// Recording format version written by this crate.
pub const RECORDING_VERSION: u32 = 1;

/// Errors saving or loading a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// File I/O failed.
    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The JSON was malformed.
    #[error("recording is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The file was written by an incompatible version.
    #[error("unsupported recording version {found} (expected {})", RECORDING_VERSION)]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
    },
}

/// A complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Format version.
    pub version: u32,
    /// Configuration the run used.
    pub config: HostConfig,
    /// Lines logged by spawn hooks.
    #[serde(default)]
    pub spawn_logs: Vec<LogEntry>,
    /// Every invocation, in order.
    pub records: Vec<TurnRecord>,
}

impl Recording {
    /// Create a recording at the current version.
    #[must_use]
    pub fn new(config: HostConfig, spawn_logs: Vec<LogEntry>, records: Vec<TurnRecord>) -> Self {
        Self {
            version: RECORDING_VERSION,
            config,
            spawn_logs,
            records,
        }
    }

    /// Number of ticks covered.
    #[must_use]
    pub fn turns(&self) -> u32 {
        self.records.last().map_or(0, |record| record.turn + 1)
    }

    /// Invocations of one unit.
    pub fn records_for(&self, unit: UnitId) -> impl Iterator<Item = &TurnRecord> {
        self.records.iter().filter(move |record| record.unit == unit)
    }

    /// Every turn log line, in emission order. Spawn logs are not included.
    pub fn log_lines(&self) -> impl Iterator<Item = &LogEntry> {
        self.records.iter().flat_map(|record| record.logs.iter())
    }

    /// Write the recording as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Read a recording written by [`Recording::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// has an unsupported version.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let reader = BufReader::new(File::open(path)?);
        let recording: Self = serde_json::from_reader(reader)?;
        if recording.version != RECORDING_VERSION {
            return Err(ReplayError::UnsupportedVersion {
                found: recording.version,
            });
        }
        Ok(recording)
    }
}
