//! Replay command implementation.

use super::CliError;
use std::path::PathBuf;
use turnstile::replay::{render_text, Recording};
use turnstile::UnitId;

/// Execute the replay command.
///
/// # Errors
///
/// Returns an error if the recording cannot be loaded.
pub(crate) fn execute(
    recording_path: PathBuf,
    turn: Option<u32>,
    unit: Option<UnitId>,
) -> Result<(), CliError> {
    let mut recording = Recording::load(&recording_path).map_err(|e| {
        CliError::new(format!("Failed to load recording {}: {e}", recording_path.display()))
    })?;

    if let Some(turn) = turn {
        if turn >= recording.turns() {
            return Err(CliError::new(format!(
                "Turn {turn} out of range (recording has {} turns)",
                recording.turns()
            )));
        }
        recording.records.retain(|record| record.turn == turn);
        recording.spawn_logs.clear();
    }

    print!("{}", render_text(&recording, unit));
    Ok(())
}
