//! End-to-end scenarios for the turn-invocation contract.
//!
//! Run with: cargo test turn_contract

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use turnstile::{
    from_fn, Agent, Direction, GridWorld, Host, HostConfig, Location, LocationLogger, Team,
    TurnContext, TurnError, TurnOutcome, TurnResult, UnitKind, UnitPhase, World,
};

fn host_with_unit_at<A: Agent>(agent: A, at: Location) -> (Host<GridWorld, A>, u32) {
    let mut world = GridWorld::new(16, 16).unwrap();
    let id = world.spawn(Team::A, UnitKind::Soldier, at).unwrap();
    (Host::new(world, agent, HostConfig::default()), id)
}

#[test]
fn test_unit_at_3_4_logs_its_location() {
    let (mut host, id) = host_with_unit_at(LocationLogger, Location::new(3, 4));

    let summary = host.step().unwrap();
    assert_eq!(summary.invoked, 1);
    assert_eq!(summary.returned, 1);
    assert_eq!(summary.actions, 0);

    let record = &host.records()[0];
    assert_eq!(record.unit, id);
    assert_eq!(record.outcome, TurnOutcome::Returned);
    let messages: Vec<&str> = record.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages, vec!["(3, 4)"]);
    assert!(record.action.is_none());
    assert_eq!(host.world().location_of(id), Some(Location::new(3, 4)));
}

#[test]
fn test_invoked_exactly_once_per_tick() {
    let (mut host, id) = host_with_unit_at(LocationLogger, Location::new(0, 0));

    for _ in 0..25 {
        host.step().unwrap();
    }

    let turns: Vec<u32> = host.records().iter().map(|r| r.turn).collect();
    assert_eq!(turns, (0..25).collect::<Vec<_>>());
    assert!(host.records().iter().all(|r| r.unit == id));
    assert!(host
        .records()
        .iter()
        .all(|r| r.outcome == TurnOutcome::Returned));
}

#[test]
fn test_location_query_is_stable_within_a_turn() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        let first = ctx.location()?;
        ctx.move_unit(Direction::North)?;
        ctx.log(first.to_string())?;
        let second = ctx.location()?;
        if first == second {
            Ok(())
        } else {
            Err(TurnError::fault("location changed mid-turn"))
        }
    });
    let (mut host, id) = host_with_unit_at(agent, Location::new(5, 5));

    host.step().unwrap();
    host.step().unwrap();

    let records = host.records();
    assert!(records.iter().all(|r| r.outcome == TurnOutcome::Returned));
    assert_eq!(records[0].logs[0].message, "(5, 5)");
    assert_eq!(records[1].logs[0].message, "(5, 6)");
    assert_eq!(host.world().location_of(id), Some(Location::new(5, 7)));
}

#[test]
fn test_no_action_means_no_mutation() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        let _ = ctx.state()?;
        let _ = ctx.can_move(Direction::East)?;
        ctx.set_indicator("idle")
    });
    let (mut host, id) = host_with_unit_at(agent, Location::new(8, 8));
    let before = host.world().snapshot(id, 0).unwrap();

    host.step().unwrap();

    let after = host.world().snapshot(id, 0).unwrap();
    assert_eq!(before, after);
    assert_eq!(host.records()[0].indicator.as_deref(), Some("idle"));
}

#[test]
fn test_fault_forfeits_turn_but_unit_survives() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        if ctx.turn()? == 0 {
            ctx.move_unit(Direction::East)?;
            ctx.log("about to fail")?;
            return Err(TurnError::fault("unhandled"));
        }
        ctx.log("next tick")
    });
    let (mut host, id) = host_with_unit_at(agent, Location::new(2, 2));

    let first = host.step().unwrap();
    assert_eq!(first.faulted, 1);
    assert_eq!(first.actions, 0);
    assert_eq!(host.world().location_of(id), Some(Location::new(2, 2)));
    assert_eq!(host.records()[0].logs[0].message, "about to fail");

    let second = host.step().unwrap();
    assert_eq!(second.invoked, 1);
    assert_eq!(second.returned, 1);
    assert_eq!(host.records()[1].logs[0].message, "next tick");
}

#[test]
fn test_panicking_agent_is_contained() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        ctx.move_unit(Direction::South)?;
        panic!("agent bug");
    });
    let (mut host, id) = host_with_unit_at(agent, Location::new(2, 2));

    host.step().unwrap();
    host.step().unwrap();

    assert_eq!(host.records().len(), 2);
    assert!(host
        .records()
        .iter()
        .all(|r| matches!(r.outcome, TurnOutcome::Faulted { .. }) && r.action.is_none()));
    assert_eq!(host.world().location_of(id), Some(Location::new(2, 2)));
    assert_eq!(host.phase(id), UnitPhase::WaitingForTurn);
}

#[test]
fn test_unbounded_loop_is_truncated() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        ctx.move_unit(Direction::West)?;
        let mut i = 0u64;
        loop {
            ctx.log(format!("iteration {i}"))?;
            i += 1;
        }
    });
    let config = HostConfig {
        turn_budget: 500,
        ..HostConfig::default()
    };
    let mut world = GridWorld::new(8, 8).unwrap();
    let id = world
        .spawn(Team::B, UnitKind::Splasher, Location::new(4, 4))
        .unwrap();
    let mut host = Host::new(world, agent, config);

    let summary = host.step().unwrap();
    assert_eq!(summary.budget_exceeded, 1);
    assert_eq!(summary.actions, 0);

    let record = &host.records()[0];
    assert_eq!(record.outcome, TurnOutcome::BudgetExceeded);
    assert!(record.budget_used > 500);
    assert!(!record.logs.is_empty(), "partial logs are kept");
    assert!(record.action.is_none());
    assert_eq!(host.world().location_of(id), Some(Location::new(4, 4)));

    // Next tick runs normally with a fresh budget.
    host.step().unwrap();
    assert_eq!(host.records()[1].turn, 1);
    assert_eq!(host.records()[1].outcome, TurnOutcome::BudgetExceeded);
}

#[test]
fn test_memory_from_failed_turns_is_discarded() {
    struct Recorder;

    impl Agent for Recorder {
        fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
            let turn = ctx.turn()?;
            let mut seen: Vec<u32> = ctx.recall("seen")?.unwrap_or_default();
            seen.push(turn);
            ctx.remember("seen", &seen)?;
            match turn {
                1 => Err(TurnError::fault("drop this turn")),
                2 => loop {
                    ctx.spend(100)?;
                },
                _ => Ok(()),
            }
        }
    }

    let (mut host, id) = host_with_unit_at(Recorder, Location::new(1, 1));
    for _ in 0..4 {
        host.step().unwrap();
    }

    let seen = host.memory(id).unwrap().get_as::<Vec<u32>>("seen").unwrap();
    assert_eq!(seen, vec![0, 3]);
}

#[test]
fn test_logging_does_not_change_state() {
    let quiet = from_fn(|ctx: &mut TurnContext<'_>| ctx.move_unit(Direction::NorthEast));
    let chatty = from_fn(|ctx: &mut TurnContext<'_>| {
        for i in 0..20 {
            ctx.log(format!("line {i}"))?;
        }
        ctx.move_unit(Direction::NorthEast)
    });

    let (mut a, id_a) = host_with_unit_at(quiet, Location::new(0, 0));
    let (mut b, id_b) = host_with_unit_at(chatty, Location::new(0, 0));
    for _ in 0..5 {
        a.step().unwrap();
        b.step().unwrap();
    }

    assert_eq!(a.world().location_of(id_a), b.world().location_of(id_b));
    assert_eq!(a.world().location_of(id_a), Some(Location::new(5, 5)));
}

#[test]
fn test_second_action_refused_first_kept() {
    let agent = from_fn(|ctx: &mut TurnContext<'_>| {
        ctx.move_unit(Direction::North)?;
        match ctx.move_unit(Direction::South) {
            Err(TurnError::ActionAlreadyTaken) => Ok(()),
            other => Err(TurnError::fault(format!("unexpected: {other:?}"))),
        }
    });
    let (mut host, id) = host_with_unit_at(agent, Location::new(3, 3));

    host.step().unwrap();
    assert_eq!(host.records()[0].outcome, TurnOutcome::Returned);
    assert_eq!(host.world().location_of(id), Some(Location::new(3, 4)));
}

#[test]
fn test_destroyed_unit_is_no_longer_invoked() {
    let mut world = GridWorld::new(4, 4).unwrap();
    let a = world
        .spawn(Team::A, UnitKind::Soldier, Location::new(0, 0))
        .unwrap();
    let b = world
        .spawn(Team::B, UnitKind::Tower, Location::new(3, 3))
        .unwrap();
    let mut host = Host::new(world, LocationLogger, HostConfig::default());

    host.step().unwrap();
    host.world_mut().despawn(b);
    host.step().unwrap();

    assert_eq!(host.invoke(b).unwrap_err(), TurnError::QueryUnavailable(b));
    let units: Vec<u32> = host.records().iter().map(|r| r.unit).collect();
    assert_eq!(units, vec![a, b, a]);
}

#[test]
fn test_loop_discarding_budget_errors_is_terminated() {
    let (done, finished) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let agent = from_fn(|ctx: &mut TurnContext<'_>| {
            loop {
                let _ = ctx.log("spin");
            }
        });
        let config = HostConfig {
            turn_budget: 500,
            ..HostConfig::default()
        };
        let mut world = GridWorld::new(8, 8).unwrap();
        world
            .spawn(Team::A, UnitKind::Soldier, Location::new(3, 3))
            .unwrap();
        let mut host = Host::new(world, agent, config);
        let summary = host.step().unwrap();
        let record = host.records()[0].clone();
        let _ = done.send((summary, record));
    });

    let (summary, record) = finished
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("host did not regain control from a spinning agent");
    assert_eq!(summary.budget_exceeded, 1);
    assert_eq!(record.outcome, TurnOutcome::BudgetExceeded);
    assert!(record.budget_used > 500);
    assert!(record.logs.iter().all(|l| l.message == "spin"));
    assert!(!record.logs.is_empty());
}
