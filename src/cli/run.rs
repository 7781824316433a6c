//! Run command implementation.

use super::output::{format_report_text, JsonMatchReport};
use super::{resolve_config, CliError, ConfigOverrides, OutputFormat};
use std::path::PathBuf;
use turnstile::batch::run_match;
use turnstile::replay::render_text;
use turnstile::LocationLogger;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the match fails to run or the recording cannot be saved.
pub(crate) fn execute(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    format: OutputFormat,
    save: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config = resolve_config(config_path.as_deref(), overrides)?;

    if !quiet && format == OutputFormat::Text {
        println!("Running match with seed {}...", config.seed);
        println!(
            "Units: {} on a {}x{} grid, budget {} per turn",
            config.units, config.world_width, config.world_height, config.turn_budget
        );
        println!();
    }

    let (report, recording) = run_match(LocationLogger, &config)?;

    if let Some(save_path) = save {
        recording.save(&save_path).map_err(|e| {
            CliError::new(format!("Failed to save recording: {e}"))
        })?;
        if !quiet && format == OutputFormat::Text {
            println!("Recording saved to: {}", save_path.display());
            println!();
        }
    }

    match format {
        OutputFormat::Text => {
            if !quiet {
                print!("{}", render_text(&recording, None));
                println!();
            }
            print!("{}", format_report_text(&report));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonMatchReport::new(&report, &recording))?;
            println!("{json}");
        }
    }

    Ok(())
}
