//! Batch command implementation.

use super::output::{format_batch_csv, format_batch_text};
use super::{resolve_config, BatchFormat, CliError, ConfigOverrides};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use turnstile::batch::{run_batch, BatchConfig};
use turnstile::LocationLogger;

/// Execute the batch command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub(crate) fn execute(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    matches: u64,
    threads: Option<usize>,
    format: BatchFormat,
    progress: bool,
) -> Result<(), CliError> {
    let host = resolve_config(config_path.as_deref(), overrides)?;

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let config = BatchConfig {
        matches,
        base_seed: host.seed,
        host,
    };

    let pb = if progress {
        let pb = ProgressBar::new(matches);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} matches ({per_sec})")
                .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let stats = run_batch(&LocationLogger, &config, || {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    });
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    let duration = start.elapsed();

    match format {
        BatchFormat::Text => {
            print!("{}", format_batch_text(&stats, config.base_seed));
            println!();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        BatchFormat::Json => {
            let json = serde_json::to_string_pretty(&stats)?;
            println!("{json}");
        }
        BatchFormat::Csv => {
            print!("{}", format_batch_csv(&stats));
        }
    }

    Ok(())
}
