//! Reference host: drives the tick loop and enforces the turn contract.
//!
//! Each tick the host takes a fresh snapshot for every live unit, invokes
//! the agent under a new budget, and resolves the invocation:
//!
//! - `Returned`: the pending action is applied, memory is committed.
//! - `BudgetExceeded`: the meter latched; action and memory are dropped.
//! - `Faulted`: the agent errored or panicked; action and memory are dropped.
//!
//! Log lines emitted before a truncation or fault are kept. The unit always
//! survives to the next tick.

mod phase;
mod world;

pub use phase::UnitPhase;
pub use world::{GridWorld, World};

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::agent::Agent;
use crate::config::HostConfig;
use crate::context::{LogEntry, SpawnContext, TurnContext};
use crate::error::{TurnError, TurnResult};
use crate::memory::UnitMemory;
use crate::replay::Recording;
use crate::unit::{UnitId, UnitState};
use crate::TurnOutcome;

/// What happened during one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Tick number.
    pub turn: u32,
    /// Unit invoked.
    pub unit: UnitId,
    /// How the invocation ended.
    pub outcome: TurnOutcome,
    /// Budget consumed.
    pub budget_used: u64,
    /// Log lines, in emission order.
    pub logs: Vec<LogEntry>,
    /// Debug note set during the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Action the host applied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

/// Counts for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Tick number.
    pub turn: u32,
    /// Units invoked.
    pub invoked: u32,
    /// Invocations that returned normally.
    pub returned: u32,
    /// Invocations truncated by the budget.
    pub budget_exceeded: u32,
    /// Invocations that faulted.
    pub faulted: u32,
    /// Actions applied.
    pub actions: u32,
}

impl TickSummary {
    fn count(&mut self, record: &TurnRecord) {
        self.invoked += 1;
        match record.outcome {
            TurnOutcome::Returned => self.returned += 1,
            TurnOutcome::BudgetExceeded => self.budget_exceeded += 1,
            TurnOutcome::Faulted { .. } => self.faulted += 1,
        }
        if record.action.is_some() {
            self.actions += 1;
        }
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Seed the world was built from.
    pub seed: u64,
    /// Ticks executed.
    pub turns_played: u32,
    /// Total invocations.
    pub invocations: u64,
    /// Invocations that returned normally.
    pub returned: u64,
    /// Invocations truncated by the budget.
    pub budget_exceeded: u64,
    /// Invocations that faulted.
    pub faulted: u64,
    /// Actions applied.
    pub actions_applied: u64,
    /// Budget consumed across all invocations.
    pub budget_used: u64,
    /// Units alive at the end.
    pub survivors: Vec<UnitId>,
}

/// The tick loop.
pub struct Host<W, A> {
    world: W,
    agent: A,
    config: HostConfig,
    turn: u32,
    phases: BTreeMap<UnitId, UnitPhase>,
    memories: BTreeMap<UnitId, UnitMemory>,
    spawn_logs: Vec<LogEntry>,
    records: Vec<TurnRecord>,
}

impl<W, A> std::fmt::Debug for Host<W, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("turn", &self.turn)
            .field("phases", &self.phases)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl<W: World, A: Agent> Host<W, A> {
    /// Create a host at turn 0.
    #[must_use]
    pub fn new(world: W, agent: A, config: HostConfig) -> Self {
        Self {
            world,
            agent,
            config,
            turn: 0,
            phases: BTreeMap::new(),
            memories: BTreeMap::new(),
            spawn_logs: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Current tick.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &W {
        &self.world
    }

    /// The world, for setting up scenarios between ticks.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Host configuration.
    #[must_use]
    pub const fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Lifecycle phase of `unit`. Units never invoked are waiting.
    #[must_use]
    pub fn phase(&self, unit: UnitId) -> UnitPhase {
        self.phases.get(&unit).copied().unwrap_or_default()
    }

    /// Committed memory of `unit`, once it has spawned.
    #[must_use]
    pub fn memory(&self, unit: UnitId) -> Option<&UnitMemory> {
        self.memories.get(&unit)
    }

    /// Every invocation so far, in order.
    #[must_use]
    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    /// Lines logged by spawn hooks.
    #[must_use]
    pub fn spawn_logs(&self) -> &[LogEntry] {
        &self.spawn_logs
    }

    /// Run the spawn hook the first time a unit is seen.
    fn ensure_spawned(&mut self, state: UnitState) {
        if self.memories.contains_key(&state.id) {
            return;
        }

        let mut memory = UnitMemory::new();
        let mut logs = Vec::new();
        let agent = &self.agent;
        let spawned = panic::catch_unwind(AssertUnwindSafe(|| {
            agent.on_spawn(&mut SpawnContext::new(state, &mut memory, &mut logs));
        }));
        if spawned.is_err() {
            warn!(unit = state.id, "spawn hook panicked; starting with empty memory");
            memory = UnitMemory::new();
        }

        debug!(unit = state.id, location = %state.location, "unit spawned");
        self.spawn_logs.append(&mut logs);
        self.memories.insert(state.id, memory);
    }

    /// Invoke the agent once for `unit` on the current tick.
    ///
    /// # Errors
    ///
    /// - [`TurnError::QueryUnavailable`] if the unit has no valid state.
    /// - [`TurnError::IllegalTransition`] if the unit was already invoked
    ///   this tick.
    ///
    /// Agent failures are not errors here; they are recorded in the
    /// returned [`TurnRecord`].
    pub fn invoke(&mut self, unit: UnitId) -> TurnResult<&TurnRecord> {
        let state = self
            .world
            .snapshot(unit, self.turn)
            .ok_or(TurnError::QueryUnavailable(unit))?;
        let invoked = self.phase(unit).transition(UnitPhase::Invoked)?;
        self.ensure_spawned(state);
        self.phases.insert(unit, invoked);

        let memory = self.memories.get(&unit).cloned().unwrap_or_default();
        let mut ctx = TurnContext::new(
            state,
            self.config.budget(),
            self.config.costs,
            &self.world,
            memory,
        );
        let agent = &self.agent;
        let result = panic::catch_unwind(AssertUnwindSafe(|| agent.turn(&mut ctx)));
        let parts = ctx.finish();

        // The meter decides truncation, whatever the agent returned.
        let outcome = if parts.budget.is_exhausted() {
            TurnOutcome::BudgetExceeded
        } else {
            match result {
                Ok(Ok(())) => TurnOutcome::Returned,
                Ok(Err(e)) => TurnOutcome::Faulted {
                    reason: e.to_string(),
                },
                Err(payload) => TurnOutcome::Faulted {
                    reason: panic_message(payload.as_ref()),
                },
            }
        };

        let mut applied = None;
        match &outcome {
            TurnOutcome::Returned => {
                self.memories.insert(unit, parts.memory);
                if let Some(action) = parts.action {
                    match self.world.apply(unit, action) {
                        Ok(()) => applied = Some(action),
                        Err(e) => warn!(unit, turn = self.turn, %e, "action refused at resolution"),
                    }
                }
            }
            TurnOutcome::BudgetExceeded => {
                warn!(
                    unit,
                    turn = self.turn,
                    used = parts.budget.used(),
                    quota = parts.budget.quota(),
                    "turn truncated"
                );
            }
            TurnOutcome::Faulted { reason } => {
                warn!(unit, turn = self.turn, %reason, "turn faulted");
            }
        }

        let phase = self.phase(unit).transition(outcome.phase())?;
        self.phases.insert(unit, phase);

        debug!(
            unit,
            turn = self.turn,
            ?phase,
            used = parts.budget.used(),
            logs = parts.logs.len(),
            "invocation finished"
        );

        self.records.push(TurnRecord {
            turn: self.turn,
            unit,
            outcome,
            budget_used: parts.budget.used(),
            logs: parts.logs,
            indicator: parts.indicator,
            action: applied,
        });
        self.records
            .last()
            .ok_or(TurnError::QueryUnavailable(unit))
    }

    /// Close the current tick: invoked units go back to waiting, state of
    /// dead units is dropped, and the turn counter advances.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::IllegalTransition`] if a unit is still mid-invocation.
    pub fn end_tick(&mut self) -> TurnResult<()> {
        let live = self.world.live_units();
        self.phases.retain(|unit, _| live.contains(unit));
        self.memories.retain(|unit, _| live.contains(unit));

        for phase in self.phases.values_mut() {
            if *phase != UnitPhase::WaitingForTurn {
                *phase = phase.transition(UnitPhase::WaitingForTurn)?;
            }
        }
        self.turn += 1;
        Ok(())
    }

    /// Run one full tick: invoke every live unit once, then close the tick.
    ///
    /// # Errors
    ///
    /// Propagates host contract violations from [`Host::invoke`]. The tick
    /// is closed before the error is returned, so units not yet reached
    /// lose this tick and the next `step` starts cleanly.
    pub fn step(&mut self) -> TurnResult<TickSummary> {
        let mut summary = TickSummary {
            turn: self.turn,
            ..TickSummary::default()
        };

        for unit in self.world.live_units() {
            // A unit may have been removed by an earlier resolution this tick.
            if self.world.snapshot(unit, self.turn).is_none() {
                continue;
            }
            let record = match self.invoke(unit) {
                Ok(record) => record,
                Err(e) => {
                    warn!(unit, turn = self.turn, %e, "tick aborted");
                    self.end_tick()?;
                    return Err(e);
                }
            };
            summary.count(record);
        }

        self.end_tick()?;
        Ok(summary)
    }

    /// Step until `max_turns` ticks have run or no units remain.
    ///
    /// # Errors
    ///
    /// Propagates host contract violations from [`Host::step`].
    pub fn run(&mut self) -> TurnResult<MatchReport> {
        let max_turns = self.config.max_turns;
        info!(
            seed = self.config.seed,
            max_turns,
            units = self.world.live_units().len(),
            "match started"
        );

        let mut report = MatchReport {
            seed: self.config.seed,
            ..MatchReport::default()
        };
        while self.turn < max_turns && !self.world.live_units().is_empty() {
            let tick = self.step()?;
            report.turns_played += 1;
            report.invocations += u64::from(tick.invoked);
            report.returned += u64::from(tick.returned);
            report.budget_exceeded += u64::from(tick.budget_exceeded);
            report.faulted += u64::from(tick.faulted);
            report.actions_applied += u64::from(tick.actions);
        }
        report.budget_used = self.records.iter().map(|r| r.budget_used).sum();
        report.survivors = self.world.live_units();

        info!(
            turns = report.turns_played,
            invocations = report.invocations,
            truncated = report.budget_exceeded,
            faulted = report.faulted,
            "match finished"
        );
        Ok(report)
    }

    /// Snapshot the run so far as a recording.
    #[must_use]
    pub fn recording(&self) -> Recording {
        Recording::new(
            self.config,
            self.spawn_logs.clone(),
            self.records.clone(),
        )
    }

    /// Consume the host, returning the world and the recording.
    #[must_use]
    pub fn into_parts(self) -> (W, Recording) {
        let recording = Recording::new(self.config, self.spawn_logs, self.records);
        (self.world, recording)
    }
}

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{from_fn, LocationLogger};
    use crate::unit::{Direction, Location, Team, UnitKind};

    fn single_unit_world(at: Location) -> (GridWorld, UnitId) {
        let mut world = GridWorld::new(10, 10).unwrap();
        let id = world.spawn(Team::A, UnitKind::Soldier, at).unwrap();
        (world, id)
    }

    #[test]
    fn test_reference_agent_logs_location() {
        let (world, id) = single_unit_world(Location::new(3, 4));
        let mut host = Host::new(world, LocationLogger, HostConfig::default());

        let record = host.invoke(id).unwrap();
        assert_eq!(record.outcome, TurnOutcome::Returned);
        assert_eq!(record.logs.len(), 1);
        assert_eq!(record.logs[0].message, "(3, 4)");
        assert!(record.action.is_none());
        assert_eq!(host.phase(id), UnitPhase::Returned);
    }

    #[test]
    fn test_double_invoke_in_one_tick_rejected() {
        let (world, id) = single_unit_world(Location::new(0, 0));
        let mut host = Host::new(world, LocationLogger, HostConfig::default());

        host.invoke(id).unwrap();
        assert!(matches!(
            host.invoke(id),
            Err(TurnError::IllegalTransition { .. })
        ));

        host.end_tick().unwrap();
        assert_eq!(host.phase(id), UnitPhase::WaitingForTurn);
        assert_eq!(host.turn(), 1);
        assert!(host.invoke(id).is_ok());
    }

    #[test]
    fn test_step_after_manual_invoke_closes_tick() {
        let (world, id) = single_unit_world(Location::new(0, 0));
        let mut host = Host::new(world, LocationLogger, HostConfig::default());

        host.invoke(id).unwrap();
        assert!(matches!(
            host.step(),
            Err(TurnError::IllegalTransition { .. })
        ));
        assert_eq!(host.turn(), 1);
        assert_eq!(host.phase(id), UnitPhase::WaitingForTurn);

        let summary = host.step().unwrap();
        assert_eq!(summary.turn, 1);
        assert_eq!(summary.returned, 1);
    }

    #[test]
    fn test_panicking_spawn_hook_starts_with_empty_memory() {
        struct FragileSpawn;

        impl Agent for FragileSpawn {
            fn on_spawn(&self, ctx: &mut SpawnContext<'_>) {
                let home = ctx.location();
                let _ = ctx.memory_mut().set("home", &home);
                panic!("spawn failed");
            }

            fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
                let home: Option<Location> = ctx.recall("home")?;
                ctx.log(format!("home known: {}", home.is_some()))
            }
        }

        let (world, id) = single_unit_world(Location::new(4, 4));
        let mut host = Host::new(world, FragileSpawn, HostConfig::default());

        let summary = host.step().unwrap();
        assert_eq!(summary.returned, 1);
        assert!(host.memory(id).unwrap().is_empty());
        assert_eq!(host.records()[0].logs[0].message, "home known: false");
        assert!(host.spawn_logs().is_empty());
    }

    #[test]
    fn test_deadline_truncates_turn() {
        let (world, id) = single_unit_world(Location::new(1, 1));
        let agent = from_fn(|ctx| {
            ctx.move_unit(Direction::North)?;
            loop {
                ctx.spend(0)?;
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
        });
        let config = HostConfig {
            turn_deadline_ms: Some(1),
            ..HostConfig::default()
        };
        let mut host = Host::new(world, agent, config);

        let summary = host.step().unwrap();
        assert_eq!(summary.budget_exceeded, 1);
        assert_eq!(host.records()[0].outcome, TurnOutcome::BudgetExceeded);
        assert!(host.records()[0].budget_used <= host.config().turn_budget);
        assert_eq!(host.world().location_of(id), Some(Location::new(1, 1)));
    }

    #[test]
    fn test_loop_ignoring_budget_error_is_terminated() {
        let (world, id) = single_unit_world(Location::new(2, 2));
        let agent = from_fn(|ctx| {
            ctx.move_unit(Direction::East)?;
            loop {
                let _ = ctx.log("spin");
            }
        });
        let config = HostConfig {
            turn_budget: 200,
            ..HostConfig::default()
        };
        let mut host = Host::new(world, agent, config);

        let summary = host.step().unwrap();
        assert_eq!(summary.budget_exceeded, 1);
        assert_eq!(host.phase(id), UnitPhase::WaitingForTurn);
        assert!(host.records()[0].action.is_none());
        assert_eq!(host.world().location_of(id), Some(Location::new(2, 2)));
    }

    #[test]
    fn test_invoke_unknown_unit() {
        let (world, _) = single_unit_world(Location::new(0, 0));
        let mut host = Host::new(world, LocationLogger, HostConfig::default());
        assert_eq!(host.invoke(99).unwrap_err(), TurnError::QueryUnavailable(99));
    }

    #[test]
    fn test_returned_move_is_applied() {
        let (world, id) = single_unit_world(Location::new(5, 5));
        let agent = from_fn(|ctx| ctx.move_unit(Direction::East));
        let mut host = Host::new(world, agent, HostConfig::default());

        let summary = host.step().unwrap();
        assert_eq!(summary.actions, 1);
        assert_eq!(host.world().location_of(id), Some(Location::new(6, 5)));
    }

    #[test]
    fn test_faulted_move_is_dropped() {
        let (world, id) = single_unit_world(Location::new(5, 5));
        let agent = from_fn(|ctx| {
            ctx.move_unit(Direction::East)?;
            Err(TurnError::fault("changed my mind"))
        });
        let mut host = Host::new(world, agent, HostConfig::default());

        let summary = host.step().unwrap();
        assert_eq!(summary.faulted, 1);
        assert_eq!(summary.actions, 0);
        assert_eq!(host.world().location_of(id), Some(Location::new(5, 5)));
        assert!(matches!(
            &host.records()[0].outcome,
            TurnOutcome::Faulted { reason } if reason.contains("changed my mind")
        ));
    }

    #[test]
    fn test_panic_is_contained() {
        let (world, id) = single_unit_world(Location::new(1, 1));
        let agent = from_fn(|ctx| {
            let turn = ctx.turn()?;
            if turn == 0 {
                panic!("boom");
            }
            ctx.log("recovered")
        });
        let mut host = Host::new(world, agent, HostConfig::default());

        host.step().unwrap();
        assert_eq!(host.phase(id), UnitPhase::WaitingForTurn);
        host.step().unwrap();

        let records = host.records();
        assert!(matches!(
            &records[0].outcome,
            TurnOutcome::Faulted { reason } if reason == "panic: boom"
        ));
        assert_eq!(records[1].outcome, TurnOutcome::Returned);
        assert_eq!(records[1].logs[0].message, "recovered");
    }

    #[test]
    fn test_swallowed_budget_error_still_truncated() {
        let (world, _) = single_unit_world(Location::new(1, 1));
        let agent = from_fn(|ctx| {
            let _ = ctx.spend(u64::MAX);
            Ok(())
        });
        let mut host = Host::new(world, agent, HostConfig::default());

        let summary = host.step().unwrap();
        assert_eq!(summary.budget_exceeded, 1);
        assert_eq!(summary.returned, 0);
    }

    #[test]
    fn test_dead_units_are_skipped() {
        let mut world = GridWorld::new(5, 5).unwrap();
        let a = world
            .spawn(Team::A, UnitKind::Soldier, Location::new(0, 0))
            .unwrap();
        let b = world
            .spawn(Team::B, UnitKind::Soldier, Location::new(4, 4))
            .unwrap();
        let mut host = Host::new(world, LocationLogger, HostConfig::default());

        host.step().unwrap();
        host.world_mut().despawn(a);
        let summary = host.step().unwrap();

        assert_eq!(summary.invoked, 1);
        assert!(host.memory(a).is_none());
        assert!(host.memory(b).is_some());
        assert!(host.records().iter().skip(2).all(|r| r.unit == b));
    }

    #[test]
    fn test_run_stops_at_max_turns() {
        let (world, id) = single_unit_world(Location::new(2, 2));
        let config = HostConfig {
            max_turns: 7,
            ..HostConfig::default()
        };
        let mut host = Host::new(world, LocationLogger, config);

        let report = host.run().unwrap();
        assert_eq!(report.turns_played, 7);
        assert_eq!(report.invocations, 7);
        assert_eq!(report.returned, 7);
        assert_eq!(report.survivors, vec![id]);
        assert_eq!(host.records().len(), 7);
    }

    #[test]
    fn test_run_stops_when_world_empty() {
        let world = GridWorld::new(2, 2).unwrap();
        let mut host = Host::new(world, LocationLogger, HostConfig::default());
        let report = host.run().unwrap();
        assert_eq!(report.turns_played, 0);
        assert!(report.survivors.is_empty());
    }
}
