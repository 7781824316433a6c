//! Lifecycle of a unit relative to the host's tick loop.

use serde::{Deserialize, Serialize};

use crate::error::{TurnError, TurnResult};

/// Where a unit is in the per-tick invocation cycle.
///
/// ```text
/// WaitingForTurn ──> Invoked ──> Returned ───────┐
///       ^                  ├──> BudgetExceeded ──┤
///       │                  └──> Faulted ─────────┤
///       └────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPhase {
    /// Ready for the next invocation.
    #[default]
    WaitingForTurn,
    /// The callback is running.
    Invoked,
    /// The callback returned normally.
    Returned,
    /// The host cut the callback off at the budget boundary.
    BudgetExceeded,
    /// The callback errored or panicked.
    Faulted,
}

impl UnitPhase {
    /// Whether this phase ends an invocation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            UnitPhase::Returned | UnitPhase::BudgetExceeded | UnitPhase::Faulted
        )
    }

    /// Move to `to`, validating the step.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::IllegalTransition`] for any step not in the cycle.
    pub fn transition(self, to: UnitPhase) -> TurnResult<UnitPhase> {
        let allowed = match (self, to) {
            (UnitPhase::WaitingForTurn, UnitPhase::Invoked) => true,
            (UnitPhase::Invoked, next) => next.is_terminal(),
            (from, UnitPhase::WaitingForTurn) => from.is_terminal(),
            _ => false,
        };

        if allowed {
            Ok(to)
        } else {
            Err(TurnError::IllegalTransition { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        for terminal in [
            UnitPhase::Returned,
            UnitPhase::BudgetExceeded,
            UnitPhase::Faulted,
        ] {
            let phase = UnitPhase::WaitingForTurn
                .transition(UnitPhase::Invoked)
                .unwrap()
                .transition(terminal)
                .unwrap()
                .transition(UnitPhase::WaitingForTurn)
                .unwrap();
            assert_eq!(phase, UnitPhase::WaitingForTurn);
        }
    }

    #[test]
    fn test_reinvoke_without_reset_rejected() {
        let err = UnitPhase::Returned
            .transition(UnitPhase::Invoked)
            .unwrap_err();
        assert_eq!(
            err,
            TurnError::IllegalTransition {
                from: UnitPhase::Returned,
                to: UnitPhase::Invoked,
            }
        );
    }

    #[test]
    fn test_invalid_steps() {
        assert!(UnitPhase::WaitingForTurn.transition(UnitPhase::Returned).is_err());
        assert!(UnitPhase::Invoked.transition(UnitPhase::WaitingForTurn).is_err());
        assert!(UnitPhase::Invoked.transition(UnitPhase::Invoked).is_err());
        assert!(UnitPhase::WaitingForTurn.transition(UnitPhase::WaitingForTurn).is_err());
    }
}
