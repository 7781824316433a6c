//! World state as seen by the host, and a minimal grid implementation.

// Grid indexing casts between u16 dimensions, i32 coordinates and u64 RNG output
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::collections::BTreeMap;

use crate::action::Action;
use crate::error::{TurnError, TurnResult, WorldError};
use crate::unit::{Direction, Location, Team, UnitId, UnitKind, UnitState};

/// Authoritative world state owned by the host.
///
/// The host reads snapshots from it before each invocation and applies
/// accepted actions to it afterwards. Callbacks only ever see it through
/// [`World::check`].
pub trait World {
    /// Live units, in the order the host invokes them (ascending id).
    fn live_units(&self) -> Vec<UnitId>;

    /// Snapshot of `unit` for `turn`, or `None` if the unit is not alive.
    fn snapshot(&self, unit: UnitId, turn: u32) -> Option<UnitState>;

    /// Whether `unit` may perform `action` right now.
    ///
    /// # Errors
    ///
    /// Returns a short reason when the action would be refused.
    fn check(&self, unit: UnitId, action: Action) -> Result<(), &'static str>;

    /// Apply `action` for `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::IllegalAction`] if the action is refused.
    fn apply(&mut self, unit: UnitId, action: Action) -> TurnResult<()>;
}

/// Deterministic PRNG using xorshift64.
#[derive(Debug, Clone, Copy)]
struct Rng {
    state: u64,
}

impl Rng {
    const fn new(seed: u64) -> Self {
        // xorshift must not start at zero
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish value in `[0, max)`.
    fn below(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        self.next_u64() % max
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    team: Team,
    kind: UnitKind,
    location: Location,
}

/// A bounded grid holding at most one unit per cell.
///
/// It tracks positions and liveness only. Moves are the one action it
/// understands.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: u16,
    height: u16,
    units: BTreeMap<UnitId, Body>,
    next_id: UnitId,
}

impl GridWorld {
    /// An empty grid. Returns `None` if either dimension is zero.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            units: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// A grid with `units` soldiers scattered over distinct cells.
    ///
    /// Teams alternate starting with [`Team::A`]. Placement depends only on
    /// `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty grid or more units than cells.
    pub fn scattered(seed: u64, width: u16, height: u16, units: u32) -> Result<Self, WorldError> {
        let mut world = Self::new(width, height).ok_or(WorldError::EmptyGrid)?;
        let cells = u64::from(width) * u64::from(height);
        if u64::from(units) > cells {
            return Err(WorldError::TooManyUnits {
                requested: units,
                width,
                height,
            });
        }

        let mut rng = Rng::new(seed);
        for i in 0..units {
            let team = if i % 2 == 0 { Team::A } else { Team::B };
            // Probe linearly from a random cell; a free cell always exists.
            let start = rng.below(cells);
            for offset in 0..cells {
                let idx = (start + offset) % cells;
                let location = Location::new(
                    (idx % u64::from(width)) as i32,
                    (idx / u64::from(width)) as i32,
                );
                if !world.is_occupied(location) {
                    world.spawn(team, UnitKind::Soldier, location);
                    break;
                }
            }
        }
        Ok(world)
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Whether `location` lies on the grid.
    #[must_use]
    pub fn in_bounds(&self, location: Location) -> bool {
        (0..i32::from(self.width)).contains(&location.x)
            && (0..i32::from(self.height)).contains(&location.y)
    }

    /// Whether a live unit stands on `location`.
    #[must_use]
    pub fn is_occupied(&self, location: Location) -> bool {
        self.units.values().any(|body| body.location == location)
    }

    /// Where `unit` stands, if alive.
    #[must_use]
    pub fn location_of(&self, unit: UnitId) -> Option<Location> {
        self.units.get(&unit).map(|body| body.location)
    }

    /// Place a new unit. Returns `None` if the cell is off the grid or taken.
    pub fn spawn(&mut self, team: Team, kind: UnitKind, location: Location) -> Option<UnitId> {
        if !self.in_bounds(location) || self.is_occupied(location) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.units.insert(id, Body { team, kind, location });
        Some(id)
    }

    /// Remove a unit. Returns whether it was alive.
    pub fn despawn(&mut self, unit: UnitId) -> bool {
        self.units.remove(&unit).is_some()
    }

    fn move_target(&self, unit: UnitId, direction: Direction) -> Result<Location, &'static str> {
        let body = self.units.get(&unit).ok_or("unit is not alive")?;
        if !body.kind.is_mobile() {
            return Err("unit cannot move");
        }
        if direction == Direction::Center {
            return Err("no movement requested");
        }
        let target = body.location.step(direction);
        if !self.in_bounds(target) {
            return Err("target is off the grid");
        }
        if self.is_occupied(target) {
            return Err("target is occupied");
        }
        Ok(target)
    }
}

impl World for GridWorld {
    fn live_units(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    fn snapshot(&self, unit: UnitId, turn: u32) -> Option<UnitState> {
        self.units.get(&unit).map(|body| UnitState {
            id: unit,
            team: body.team,
            kind: body.kind,
            location: body.location,
            turn,
        })
    }

    fn check(&self, unit: UnitId, action: Action) -> Result<(), &'static str> {
        match action {
            Action::Move(direction) => self.move_target(unit, direction).map(|_| ()),
        }
    }

    fn apply(&mut self, unit: UnitId, action: Action) -> TurnResult<()> {
        match action {
            Action::Move(direction) => {
                let target = self
                    .move_target(unit, direction)
                    .map_err(|reason| TurnError::IllegalAction { action, reason })?;
                if let Some(body) = self.units.get_mut(&unit) {
                    body.location = target;
                }
                Ok(())
            }
        }
    }
}
