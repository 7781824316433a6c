//! Cooperative per-turn budget metering.
//!
//! Every host call a callback makes is charged against the turn's quota,
//! and callbacks can declare their own work with [`TurnContext::spend`].
//! Once the quota (or the optional wall-clock deadline) is exceeded the
//! meter latches: every later charge fails and the host records the turn as
//! truncated, whatever the callback returns.
//!
//! [`TurnContext::spend`]: crate::context::TurnContext::spend

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{TurnError, TurnResult};

/// Default budget granted to each unit per turn.
pub const DEFAULT_TURN_BUDGET: u64 = 10_000;

/// Cost charged for each kind of host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    /// Any read-only query (location, turn, team, ...).
    pub query: u64,
    /// Fixed cost of a log or indicator call.
    pub log_call: u64,
    /// Additional cost per byte of logged text.
    pub log_byte: u64,
    /// An action request, accepted or not.
    pub action: u64,
    /// A unit memory read or write.
    pub memory: u64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            query: 2,
            log_call: 10,
            log_byte: 1,
            action: 20,
            memory: 5,
        }
    }
}

impl CostTable {
    /// Cost of logging `message`.
    #[must_use]
    pub fn log_cost(&self, message: &str) -> u64 {
        let bytes = u64::try_from(message.len()).unwrap_or(u64::MAX);
        self.log_call
            .saturating_add(bytes.saturating_mul(self.log_byte))
    }
}

/// Budget meter for a single turn.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    quota: u64,
    used: u64,
    deadline: Option<Instant>,
    exhausted: bool,
}

impl Budget {
    /// A budget of `quota` units with no deadline.
    #[must_use]
    pub const fn new(quota: u64) -> Self {
        Self {
            quota,
            used: 0,
            deadline: None,
            exhausted: false,
        }
    }

    /// A budget of `quota` units that also expires `limit` from now.
    #[must_use]
    pub fn with_deadline(quota: u64, limit: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(limit),
            ..Self::new(quota)
        }
    }

    /// Charge `cost` units.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::BudgetExceeded`] if this charge (or an earlier
    /// one) pushed usage past the quota, or the deadline has passed.
    pub fn charge(&mut self, cost: u64) -> TurnResult<()> {
        if self.exhausted {
            return Err(self.exceeded());
        }

        self.used = self.used.saturating_add(cost);
        let late = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if self.used > self.quota || late {
            self.exhausted = true;
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// Units consumed so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Units granted for the turn.
    #[must_use]
    pub const fn quota(&self) -> u64 {
        self.quota
    }

    /// Units left before the meter latches.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.quota.saturating_sub(self.used)
    }

    /// Whether the meter has latched.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    const fn exceeded(&self) -> TurnError {
        TurnError::BudgetExceeded {
            used: self.used,
            quota: self.quota,
        }
    }
}
