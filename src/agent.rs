//! The per-turn callback and the reference implementation.

use crate::context::{SpawnContext, TurnContext};
use crate::error::TurnResult;

/// User code driving a unit.
///
/// The host calls [`Agent::turn`] once per tick for each live unit the
/// agent controls. Implementations keep no state between turns: `turn`
/// takes `&self`, and anything worth remembering goes through the unit
/// memory on the context.
///
/// An agent must return promptly. The host truncates it at the budget
/// boundary, but only when it makes a metered call; pure computation
/// should be declared with [`TurnContext::spend`]. A metered call made
/// after the budget error has been reported does not return.
pub trait Agent: Send + Sync {
    /// Called once per unit before its first turn. Unmetered; cannot act.
    fn on_spawn(&self, _ctx: &mut SpawnContext<'_>) {}

    /// Play one turn.
    ///
    /// # Errors
    ///
    /// Any error forfeits the turn: the host discards the pending action
    /// and memory changes, and the unit plays again next tick.
    fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()>;
}

impl<T: Agent + ?Sized> Agent for &T {
    fn on_spawn(&self, ctx: &mut SpawnContext<'_>) {
        (**self).on_spawn(ctx);
    }

    fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
        (**self).turn(ctx)
    }
}

impl<T: Agent + ?Sized> Agent for Box<T> {
    fn on_spawn(&self, ctx: &mut SpawnContext<'_>) {
        (**self).on_spawn(ctx);
    }

    fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
        (**self).turn(ctx)
    }
}

/// Reports its own location every turn and does nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationLogger;

impl Agent for LocationLogger {
    fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
        let location = ctx.location()?;
        ctx.log(location.to_string())
    }
}

/// An agent built from a closure. See [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnAgent<F> {
    turn: F,
}

impl<F> std::fmt::Debug for FnAgent<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAgent").finish_non_exhaustive()
    }
}

impl<F> Agent for FnAgent<F>
where
    F: Fn(&mut TurnContext<'_>) -> TurnResult<()> + Send + Sync,
{
    fn turn(&self, ctx: &mut TurnContext<'_>) -> TurnResult<()> {
        (self.turn)(ctx)
    }
}

/// Wrap a closure as an [`Agent`] with no spawn hook.
///
/// ```
/// use turnstile::agent::from_fn;
///
/// let agent = from_fn(|ctx| {
///     let turn = ctx.turn()?;
///     ctx.log(format!("turn {turn}"))
/// });
/// # let _ = agent;
/// ```
#[must_use]
pub fn from_fn<F>(turn: F) -> FnAgent<F>
where
    F: Fn(&mut TurnContext<'_>) -> TurnResult<()> + Send + Sync,
{
    FnAgent { turn }
}
