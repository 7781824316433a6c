//! The capability object handed to a callback for one turn.
//!
//! A [`TurnContext`] is the callback's only window onto the host. It
//! exposes a frozen snapshot of the unit, a log channel, the unit's memory
//! and the action primitives, and charges each call against the turn
//! budget. Nothing it does touches world state directly: an accepted action
//! is only recorded here and applied by the host after the callback
//! returns.

use std::panic;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::action::Action;
use crate::budget::{Budget, CostTable};
use crate::error::{TurnError, TurnResult};
use crate::host::World;
use crate::memory::UnitMemory;
use crate::unit::{Direction, Location, Team, UnitId, UnitKind, UnitState};

/// One diagnostic line emitted by a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Turn the line was emitted on.
    pub turn: u32,
    /// Unit that emitted it.
    pub unit: UnitId,
    /// The text.
    pub message: String,
}

/// Unwind payload raised by a metered call made after the budget latched.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BudgetTrap;

/// Everything a finished turn leaves behind, handed back to the host.
#[derive(Debug)]
pub(crate) struct TurnParts {
    pub(crate) budget: Budget,
    pub(crate) logs: Vec<LogEntry>,
    pub(crate) indicator: Option<String>,
    pub(crate) action: Option<Action>,
    pub(crate) memory: UnitMemory,
}

/// Per-turn interface between a callback and the host.
pub struct TurnContext<'a> {
    state: UnitState,
    budget: Budget,
    costs: CostTable,
    world: &'a dyn World,
    logs: Vec<LogEntry>,
    indicator: Option<String>,
    action: Option<Action>,
    memory: UnitMemory,
}

impl std::fmt::Debug for TurnContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("state", &self.state)
            .field("budget", &self.budget)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl<'a> TurnContext<'a> {
    pub(crate) fn new(
        state: UnitState,
        budget: Budget,
        costs: CostTable,
        world: &'a dyn World,
        memory: UnitMemory,
    ) -> Self {
        Self {
            state,
            budget,
            costs,
            world,
            logs: Vec::new(),
            indicator: None,
            action: None,
            memory,
        }
    }

    pub(crate) fn finish(self) -> TurnParts {
        TurnParts {
            budget: self.budget,
            logs: self.logs,
            indicator: self.indicator,
            action: self.action,
            memory: self.memory,
        }
    }

    /// Charge `cost`. The first charge past the quota returns
    /// [`TurnError::BudgetExceeded`]; any metered call after that unwinds
    /// out of the callback so a loop that ignores the error still ends.
    fn charge(&mut self, cost: u64) -> TurnResult<()> {
        if self.budget.is_exhausted() {
            // resume_unwind skips the panic hook
            panic::resume_unwind(Box::new(BudgetTrap));
        }
        self.budget.charge(cost)
    }

    fn query<T>(&mut self, value: T) -> TurnResult<T> {
        self.charge(self.costs.query)?;
        Ok(value)
    }

    /// The whole unit snapshot.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn state(&mut self) -> TurnResult<UnitState> {
        self.query(self.state)
    }

    /// This unit's identifier.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn id(&mut self) -> TurnResult<UnitId> {
        self.query(self.state.id)
    }

    /// This unit's team.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn team(&mut self) -> TurnResult<Team> {
        self.query(self.state.team)
    }

    /// This unit's kind.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn kind(&mut self) -> TurnResult<UnitKind> {
        self.query(self.state.kind)
    }

    /// The current turn number.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn turn(&mut self) -> TurnResult<u32> {
        self.query(self.state.turn)
    }

    /// Where this unit stands as of this turn.
    ///
    /// The value is a snapshot: it does not change within the turn, even
    /// after a move has been requested.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn location(&mut self) -> TurnResult<Location> {
        self.query(self.state.location)
    }

    /// Append a line to this turn's log.
    ///
    /// Logging never faults the turn and never affects unit state. It is
    /// metered like any other call.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted; the line is dropped.
    pub fn log(&mut self, message: impl Into<String>) -> TurnResult<()> {
        let message = message.into();
        self.charge(self.costs.log_cost(&message))?;
        trace!(unit = self.state.id, turn = self.state.turn, %message, "agent log");
        self.logs.push(LogEntry {
            turn: self.state.turn,
            unit: self.state.id,
            message,
        });
        Ok(())
    }

    /// Set the debug note shown for this unit in recordings. The last call
    /// in a turn wins.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn set_indicator(&mut self, text: impl Into<String>) -> TurnResult<()> {
        let text = text.into();
        self.charge(self.costs.log_cost(&text))?;
        self.indicator = Some(text);
        Ok(())
    }

    /// Declare `units` of the callback's own computation.
    ///
    /// Long-running strategy code calls this periodically so the host can
    /// truncate it at the budget boundary.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::BudgetExceeded`] when the budget runs out. Calling
    /// any metered method after that does not return: the host terminates
    /// the turn.
    pub fn spend(&mut self, units: u64) -> TurnResult<()> {
        self.charge(units)
    }

    /// Whether an action has been accepted this turn.
    #[must_use]
    pub const fn has_acted(&self) -> bool {
        self.action.is_some()
    }

    /// Whether `move_unit(direction)` would be accepted right now.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn can_move(&mut self, direction: Direction) -> TurnResult<bool> {
        self.charge(self.costs.query)?;
        Ok(self.action.is_none()
            && self
                .world
                .check(self.state.id, Action::Move(direction))
                .is_ok())
    }

    /// Request a one-step move. Applied when the turn returns normally.
    ///
    /// # Errors
    ///
    /// See [`TurnContext::request`].
    pub fn move_unit(&mut self, direction: Direction) -> TurnResult<()> {
        self.request(Action::Move(direction))
    }

    /// Request `action` for this turn.
    ///
    /// # Errors
    ///
    /// - [`TurnError::BudgetExceeded`] if the budget is gone.
    /// - [`TurnError::ActionAlreadyTaken`] if an action was already accepted.
    /// - [`TurnError::IllegalAction`] if the host would refuse it.
    pub fn request(&mut self, action: Action) -> TurnResult<()> {
        self.charge(self.costs.action)?;
        if self.action.is_some() {
            return Err(TurnError::ActionAlreadyTaken);
        }
        self.world
            .check(self.state.id, action)
            .map_err(|reason| TurnError::IllegalAction { action, reason })?;
        self.action = Some(action);
        Ok(())
    }

    /// Read a value this unit stored on an earlier turn.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn recall<T: DeserializeOwned>(&mut self, key: &str) -> TurnResult<Option<T>> {
        self.charge(self.costs.memory)?;
        Ok(self.memory.get_as(key))
    }

    /// Store a value for later turns. Kept only if this turn returns normally.
    ///
    /// # Errors
    ///
    /// Fails when the budget is exhausted, or with [`TurnError::Fault`] if
    /// the value cannot be serialized.
    pub fn remember<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> TurnResult<()> {
        self.charge(self.costs.memory)?;
        self.memory
            .set(key, value)
            .map(|_| ())
            .map_err(|e| TurnError::fault(format!("cannot store `{key}`: {e}")))
    }

    /// Drop a stored value. Kept only if this turn returns normally.
    ///
    /// # Errors
    ///
    /// Fails only when the turn budget is exhausted.
    pub fn forget(&mut self, key: &str) -> TurnResult<()> {
        self.charge(self.costs.memory)?;
        self.memory.remove(key);
        Ok(())
    }
}

/// Interface for the one-time spawn hook.
///
/// Unmetered and unable to act: it may log and seed the unit's memory.
pub struct SpawnContext<'a> {
    state: UnitState,
    memory: &'a mut UnitMemory,
    logs: &'a mut Vec<LogEntry>,
}

impl std::fmt::Debug for SpawnContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnContext")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> SpawnContext<'a> {
    pub(crate) fn new(
        state: UnitState,
        memory: &'a mut UnitMemory,
        logs: &'a mut Vec<LogEntry>,
    ) -> Self {
        Self { state, memory, logs }
    }

    /// Snapshot of the unit at spawn.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Spawn location.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.state.location
    }

    /// Append a line to the spawn log.
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry {
            turn: self.state.turn,
            unit: self.state.id,
            message: message.into(),
        });
    }

    /// The unit's memory, for seeding initial values.
    pub fn memory_mut(&mut self) -> &mut UnitMemory {
        &mut *self.memory
    }
}
