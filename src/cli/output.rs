//! Output formatting utilities for CLI.

use serde::Serialize;
use turnstile::batch::BatchStats;
use turnstile::replay::Recording;
use turnstile::{LogEntry, MatchReport};

/// JSON-serializable match result.
#[derive(Debug, Serialize)]
pub(super) struct JsonMatchReport<'a> {
    /// Summary counts.
    #[serde(flatten)]
    pub(super) report: &'a MatchReport,
    /// Every turn log line.
    pub(super) logs: Vec<&'a LogEntry>,
}

impl<'a> JsonMatchReport<'a> {
    /// Create from a report and its recording.
    pub(super) fn new(report: &'a MatchReport, recording: &'a Recording) -> Self {
        Self {
            report,
            logs: recording.log_lines().collect(),
        }
    }
}

/// Format a match report as human-readable text.
pub(super) fn format_report_text(report: &MatchReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Match Result (seed: {})\n", report.seed));
    output.push_str(&format!("  Turns: {}\n", report.turns_played));
    output.push_str(&format!("  Invocations: {}\n", report.invocations));
    output.push_str(&format!(
        "    returned: {}, budget exceeded: {}, faulted: {}\n",
        report.returned, report.budget_exceeded, report.faulted
    ));
    output.push_str(&format!("  Actions applied: {}\n", report.actions_applied));
    output.push_str(&format!("  Budget used: {}\n", report.budget_used));
    output.push_str(&format!("  Survivors: {}\n", report.survivors.len()));

    output
}

/// Format batch stats as human-readable text.
pub(super) fn format_batch_text(stats: &BatchStats, base_seed: u64) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Batch Results ({} matches, base seed {base_seed})\n",
        stats.matches
    ));
    output.push_str("========================================\n\n");
    if stats.failed > 0 {
        output.push_str(&format!("  Failed matches: {}\n", stats.failed));
    }
    output.push_str(&format!("  Turns: {}\n", stats.turns));
    output.push_str(&format!("  Invocations: {}\n", stats.invocations));
    output.push_str(&format!("    returned: {}\n", stats.returned));
    output.push_str(&format!("    budget exceeded: {}\n", stats.budget_exceeded));
    output.push_str(&format!("    faulted: {}\n", stats.faulted));
    output.push_str(&format!("  Actions applied: {}\n", stats.actions_applied));
    output.push_str(&format!(
        "  Mean budget per invocation: {:.1}\n",
        stats.mean_budget_per_invocation()
    ));

    output
}

/// Format batch stats as CSV.
pub(super) fn format_batch_csv(stats: &BatchStats) -> String {
    let mut output = String::new();

    output.push_str(
        "matches,failed,turns,invocations,returned,budget_exceeded,faulted,actions_applied,budget_used\n",
    );
    output.push_str(&format!(
        "{},{},{},{},{},{},{},{},{}\n",
        stats.matches,
        stats.failed,
        stats.turns,
        stats.invocations,
        stats.returned,
        stats.budget_exceeded,
        stats.faulted,
        stats.actions_applied,
        stats.budget_used
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_csv_has_one_row() {
        let stats = BatchStats {
            matches: 2,
            invocations: 8,
            returned: 8,
            ..BatchStats::default()
        };
        let csv = format_batch_csv(&stats);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2,0,0,8,8,0,0,0,0");
    }

    #[test]
    fn test_report_text_mentions_outcomes() {
        let report = MatchReport {
            seed: 5,
            turns_played: 3,
            invocations: 6,
            returned: 5,
            faulted: 1,
            ..MatchReport::default()
        };
        let text = format_report_text(&report);
        assert!(text.contains("seed: 5"));
        assert!(text.contains("returned: 5, budget exceeded: 0, faulted: 1"));
    }
}
