//! Plain-text rendering of recordings.

use std::fmt::Write;

use super::Recording;
use crate::unit::UnitId;
use crate::TurnOutcome;

/// Render a recording as a per-turn listing.
///
/// ```text
/// spawn unit 1: hello
/// turn 0
///   unit 1 [returned] used 18
///     log: (3, 4)
/// ```
///
/// When `unit` is given only that unit's invocations are shown.
#[must_use]
pub fn render_text(recording: &Recording, unit: Option<UnitId>) -> String {
    let mut out = String::new();

    for entry in &recording.spawn_logs {
        if unit.is_none_or(|u| u == entry.unit) {
            let _ = writeln!(out, "spawn unit {}: {}", entry.unit, entry.message);
        }
    }

    let mut current_turn = None;
    for record in &recording.records {
        if unit.is_some_and(|u| u != record.unit) {
            continue;
        }
        if current_turn != Some(record.turn) {
            let _ = writeln!(out, "turn {}", record.turn);
            current_turn = Some(record.turn);
        }

        let _ = writeln!(
            out,
            "  unit {} [{}] used {}",
            record.unit,
            record.outcome.label(),
            record.budget_used
        );
        if let TurnOutcome::Faulted { reason } = &record.outcome {
            let _ = writeln!(out, "    fault: {reason}");
        }
        for entry in &record.logs {
            let _ = writeln!(out, "    log: {}", entry.message);
        }
        if let Some(indicator) = &record.indicator {
            let _ = writeln!(out, "    indicator: {indicator}");
        }
        if let Some(action) = &record.action {
            let _ = writeln!(out, "    action: {action}");
        }
    }

    out
}
