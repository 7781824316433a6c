#![no_main]

//! Host turn fuzzer.
//!
//! Drives arbitrary agent scripts through the host for a few ticks and
//! checks the contract after each one:
//! 1. Each live unit gets exactly one record per tick
//! 2. Truncated and faulted turns never move their unit
//! 3. Units never leave the grid or share a cell

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use turnstile::{
    from_fn, Direction, GridWorld, Host, HostConfig, Location, TurnContext, TurnError,
    TurnOutcome, World,
};

/// One call an agent makes during its turn.
#[derive(Arbitrary, Debug, Clone)]
enum FuzzOp {
    Query,
    Log(String),
    Indicator(String),
    Spend(u16),
    Move(u8),
    Remember(u8, i32),
    Recall(u8),
    Fail,
}

/// Structured input for a short match.
#[derive(Arbitrary, Debug)]
struct HostTurnInput {
    seed: u64,
    width: u8,
    height: u8,
    units: u8,
    budget: u16,
    ticks: u8,
    script: Vec<FuzzOp>,
}

fn play(ctx: &mut TurnContext<'_>, script: &[FuzzOp]) -> Result<(), TurnError> {
    for op in script {
        match op {
            FuzzOp::Query => {
                let _ = ctx.state()?;
            }
            FuzzOp::Log(text) => ctx.log(text.clone())?,
            FuzzOp::Indicator(text) => ctx.set_indicator(text.clone())?,
            FuzzOp::Spend(n) => ctx.spend(u64::from(*n))?,
            FuzzOp::Move(d) => {
                let dir = Direction::ALL[usize::from(*d) % Direction::ALL.len()];
                // Refused moves are ignored; past the budget this unwinds out of the turn.
                let _ = ctx.move_unit(dir);
            }
            FuzzOp::Remember(key, value) => ctx.remember(&key.to_string(), value)?,
            FuzzOp::Recall(key) => {
                let _: Option<i32> = ctx.recall(&key.to_string())?;
            }
            FuzzOp::Fail => return Err(TurnError::fault("fuzz")),
        }
    }
    Ok(())
}

fuzz_target!(|input: HostTurnInput| {
    // Cap values to avoid excessive runtime
    let width = u16::from(input.width % 12).max(1);
    let height = u16::from(input.height % 12).max(1);
    let units = u32::from(input.units % 16).min(u32::from(width * height));
    let ticks = (input.ticks % 8).max(1);
    let script: Vec<FuzzOp> = input.script.into_iter().take(32).collect();

    let Ok(world) = GridWorld::scattered(input.seed, width, height, units) else {
        return;
    };
    let config = HostConfig {
        turn_budget: u64::from(input.budget).max(1),
        ..HostConfig::default()
    };
    let agent = from_fn(move |ctx: &mut TurnContext<'_>| play(ctx, &script));
    let mut host = Host::new(world, agent, config);

    for _ in 0..ticks {
        let live = host.world().live_units();
        let before: Vec<Option<Location>> =
            live.iter().map(|&u| host.world().location_of(u)).collect();
        let start = host.records().len();

        let Ok(summary) = host.step() else {
            panic!("host violated its own phase machine");
        };

        let records = &host.records()[start..];
        let recorded: Vec<u32> = records.iter().map(|r| r.unit).collect();
        assert_eq!(recorded, live);
        assert_eq!(summary.invoked as usize, live.len());

        for (record, location) in records.iter().zip(&before) {
            if record.outcome != TurnOutcome::Returned {
                assert!(record.action.is_none());
                assert_eq!(host.world().location_of(record.unit), *location);
            }
        }

        let mut cells: Vec<Location> = live
            .iter()
            .filter_map(|&u| host.world().location_of(u))
            .collect();
        assert!(cells.iter().all(|&c| host.world().in_bounds(c)));
        cells.sort_by_key(|c| (c.x, c.y));
        cells.dedup();
        assert_eq!(cells.len(), live.len());
    }
});
