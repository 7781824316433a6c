//! Turnstile CLI - run, batch and replay matches of the reference agent.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Turnstile - host harness for budgeted per-turn robot callbacks
#[derive(Parser, Debug)]
#[command(name = "turnstile")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Match settings shared by `run` and `batch`
#[derive(ClapArgs, Debug)]
struct MatchArgs {
    /// JSON config file (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum turns
    #[arg(short, long)]
    turns: Option<u32>,

    /// Budget per unit per turn
    #[arg(short, long)]
    budget: Option<u64>,

    /// Units placed on the grid
    #[arg(short, long)]
    units: Option<u32>,

    /// Grid width
    #[arg(long)]
    width: Option<u16>,

    /// Grid height
    #[arg(long)]
    height: Option<u16>,
}

impl MatchArgs {
    fn split(self) -> (Option<PathBuf>, cli::ConfigOverrides) {
        let overrides = cli::ConfigOverrides {
            seed: self.seed,
            turns: self.turns,
            budget: self.budget,
            units: self.units,
            width: self.width,
            height: self.height,
        };
        (self.config, overrides)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single match with the reference agent
    Run {
        #[command(flatten)]
        settings: MatchArgs,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save recording to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Only print the summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run many seeded matches in parallel and aggregate statistics
    Batch {
        #[command(flatten)]
        settings: MatchArgs,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        matches: u64,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::BatchFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Print a saved recording
    Replay {
        /// Recording file (JSON)
        #[arg(required = true)]
        recording: PathBuf,

        /// Only show this turn
        #[arg(short, long)]
        turn: Option<u32>,

        /// Only show this unit
        #[arg(short, long)]
        unit: Option<u32>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            settings,
            format,
            save,
            quiet,
        } => {
            let (config, overrides) = settings.split();
            cli::run::execute(config, overrides, format, save, quiet)
        }

        Commands::Batch {
            settings,
            matches,
            threads,
            format,
            progress,
        } => {
            let (config, overrides) = settings.split();
            cli::batch::execute(config, overrides, matches, threads, format, progress)
        }

        Commands::Replay {
            recording,
            turn,
            unit,
        } => cli::replay::execute(recording, turn, unit),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
