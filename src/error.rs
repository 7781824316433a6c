//! Error types for the turn contract and the reference host.

use thiserror::Error;

use crate::action::Action;
use crate::config::ConfigError;
use crate::host::UnitPhase;
use crate::unit::UnitId;

/// Errors a callback can observe during a turn, and that the host reports
/// when the contract is violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The per-turn budget ran out. No further host calls succeed this turn.
    #[error("turn budget exceeded ({used} used, {quota} allowed)")]
    BudgetExceeded {
        /// Budget consumed when the meter latched.
        used: u64,
        /// Budget granted for the turn.
        quota: u64,
    },
    /// The callback failed: it returned an error or panicked.
    #[error("agent fault: {0}")]
    Fault(String),
    /// No valid unit state exists, e.g. the unit was destroyed.
    #[error("no valid state for unit {0}")]
    QueryUnavailable(UnitId),
    /// A second action was requested in the same turn.
    #[error("an action was already requested this turn")]
    ActionAlreadyTaken,
    /// The host refused the action.
    #[error("illegal action `{action}`: {reason}")]
    IllegalAction {
        /// The refused action.
        action: Action,
        /// Why the host refused it.
        reason: &'static str,
    },
    /// The host tried to move a unit through an invalid lifecycle step.
    #[error("illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Phase the unit was in.
        from: UnitPhase,
        /// Phase that was requested.
        to: UnitPhase,
    },
}

impl TurnError {
    /// Shorthand for a callback-level failure.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }

    /// Whether this is a budget truncation.
    #[must_use]
    pub const fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }
}

/// Result type for host calls made during a turn.
pub type TurnResult<T> = Result<T, TurnError>;

/// Errors building a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Width or height is zero.
    #[error("grid dimensions must be non-zero")]
    EmptyGrid,
    /// More units requested than there are cells.
    #[error("cannot place {requested} units on a {width}x{height} grid")]
    TooManyUnits {
        /// Units requested.
        requested: u32,
        /// Grid width.
        width: u16,
        /// Grid height.
        height: u16,
    },
}

/// Errors running a complete match.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The world could not be built.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The host hit a contract violation.
    #[error(transparent)]
    Turn(#[from] TurnError),
}
