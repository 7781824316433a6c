// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Turnstile: the turn-invocation contract for budgeted robot programs.
//!
//! A host advances a tick counter and, once per tick, calls each live
//! unit's [`Agent`] with a [`TurnContext`]. The context is the agent's only
//! capability: snapshot queries, a log channel, unit memory and at most one
//! action, all metered against a per-turn [`Budget`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Batch runner (rayon, seeded)      │
//! ├─────────────────────────────────────┤
//! │   Host tick loop  ──>  Recording    │
//! ├─────────────────────────────────────┤
//! │   TurnContext + Budget meter        │
//! ├─────────────────────────────────────┤
//! │   Agent callback (user code)        │
//! └─────────────────────────────────────┘
//! ```

pub mod action;
pub mod agent;
pub mod batch;
pub mod budget;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod memory;
pub mod replay;
pub mod unit;

use serde::{Deserialize, Serialize};

pub use action::Action;
pub use agent::{from_fn, Agent, LocationLogger};
pub use budget::{Budget, CostTable};
pub use config::HostConfig;
pub use context::{LogEntry, SpawnContext, TurnContext};
pub use error::{MatchError, TurnError, TurnResult, WorldError};
pub use host::{GridWorld, Host, MatchReport, TurnRecord, UnitPhase, World};
pub use memory::UnitMemory;
pub use unit::{Direction, Location, Team, UnitId, UnitKind, UnitState};

/// How a single invocation of an agent ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The agent returned normally; its action (if any) was applied.
    Returned,
    /// The budget ran out; the turn was cut off with no action.
    BudgetExceeded,
    /// The agent returned an error or panicked; no action was taken.
    Faulted {
        /// Error or panic text.
        reason: String,
    },
}

impl TurnOutcome {
    /// The terminal lifecycle phase this outcome corresponds to.
    #[must_use]
    pub const fn phase(&self) -> UnitPhase {
        match self {
            TurnOutcome::Returned => UnitPhase::Returned,
            TurnOutcome::BudgetExceeded => UnitPhase::BudgetExceeded,
            TurnOutcome::Faulted { .. } => UnitPhase::Faulted,
        }
    }

    /// Short lowercase label for text output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Returned => "returned",
            TurnOutcome::BudgetExceeded => "budget exceeded",
            TurnOutcome::Faulted { .. } => "faulted",
        }
    }
}
