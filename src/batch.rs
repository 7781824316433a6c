//! Seeded matches, run one at a time or in parallel batches.
//!
//! Each match owns its world and host, so matches are independent and the
//! batch is parallelized across them with rayon. Inside a match units are
//! still invoked strictly one after another.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::Agent;
use crate::config::HostConfig;
use crate::error::MatchError;
use crate::host::{GridWorld, Host, MatchReport};
use crate::replay::Recording;

/// Run one match on a scattered grid built from `config.seed`.
///
/// # Errors
///
/// Returns an error if the config is invalid, the world cannot be built, or
/// the host hits a contract violation.
pub fn run_match<A: Agent>(
    agent: A,
    config: &HostConfig,
) -> Result<(MatchReport, Recording), MatchError> {
    config.validate()?;
    let world = GridWorld::scattered(
        config.seed,
        config.world_width,
        config.world_height,
        config.units,
    )?;
    let mut host = Host::new(world, agent, *config);
    let report = host.run()?;
    let (_, recording) = host.into_parts();
    Ok((report, recording))
}

/// Parameters for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Matches to run.
    pub matches: u64,
    /// Seed of match 0; match `i` uses `base_seed + i`.
    pub base_seed: u64,
    /// Settings shared by every match. Its `seed` is overridden per match.
    pub host: HostConfig,
}

/// Aggregated counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Matches that completed.
    pub matches: u64,
    /// Matches that failed to run.
    pub failed: u64,
    /// Ticks across all matches.
    pub turns: u64,
    /// Invocations across all matches.
    pub invocations: u64,
    /// Invocations that returned normally.
    pub returned: u64,
    /// Invocations truncated by the budget.
    pub budget_exceeded: u64,
    /// Invocations that faulted.
    pub faulted: u64,
    /// Actions applied.
    pub actions_applied: u64,
    /// Budget consumed.
    pub budget_used: u64,
}

impl BatchStats {
    /// Fold one match report in.
    pub fn add_report(&mut self, report: &MatchReport) {
        self.matches += 1;
        self.turns += u64::from(report.turns_played);
        self.invocations += report.invocations;
        self.returned += report.returned;
        self.budget_exceeded += report.budget_exceeded;
        self.faulted += report.faulted;
        self.actions_applied += report.actions_applied;
        self.budget_used += report.budget_used;
    }

    /// Combine with stats from another worker.
    pub fn merge(&mut self, other: &BatchStats) {
        self.matches += other.matches;
        self.failed += other.failed;
        self.turns += other.turns;
        self.invocations += other.invocations;
        self.returned += other.returned;
        self.budget_exceeded += other.budget_exceeded;
        self.faulted += other.faulted;
        self.actions_applied += other.actions_applied;
        self.budget_used += other.budget_used;
    }

    /// Mean budget consumed per invocation.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_budget_per_invocation(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            self.budget_used as f64 / self.invocations as f64
        }
    }
}

/// Run `config.matches` matches in parallel on the current rayon pool.
///
/// `on_match` is called after each match finishes (from worker threads),
/// e.g. to advance a progress bar. The result does not depend on the
/// number of threads.
#[must_use]
pub fn run_batch<A, P>(agent: &A, config: &BatchConfig, on_match: P) -> BatchStats
where
    A: Agent + ?Sized,
    P: Fn() + Sync,
{
    (0..config.matches)
        .into_par_iter()
        .fold(BatchStats::default, |mut stats, i| {
            let host_config = HostConfig {
                seed: config.base_seed.wrapping_add(i),
                ..config.host
            };
            match run_match(agent, &host_config) {
                Ok((report, _)) => stats.add_report(&report),
                Err(e) => {
                    warn!(seed = host_config.seed, %e, "match failed");
                    stats.failed += 1;
                }
            }
            on_match();
            stats
        })
        .reduce(BatchStats::default, |mut a, b| {
            a.merge(&b);
            a
        })
}
