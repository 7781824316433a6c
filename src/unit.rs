//! Unit identity, grid positions and the per-turn state snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a unit, assigned by the host at spawn.
pub type UnitId = u32;

/// A compass direction on the grid, plus `Center` for "stay put".
///
/// North is `+y`, east is `+x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Up (`+y`).
    North,
    /// Up and right.
    NorthEast,
    /// Right (`+x`).
    East,
    /// Down and right.
    SouthEast,
    /// Down (`-y`).
    South,
    /// Down and left.
    SouthWest,
    /// Left (`-x`).
    West,
    /// Up and left.
    NorthWest,
    /// No movement.
    Center,
}

impl Direction {
    /// The eight movement directions, clockwise from north. `Center` is excluded.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Offset `(dx, dy)` applied by one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
            Direction::Center => (0, 0),
        }
    }

    /// Direction matching the signs of `(dx, dy)`.
    #[must_use]
    pub const fn from_delta(dx: i32, dy: i32) -> Self {
        match (dx.signum(), dy.signum()) {
            (0, 1) => Direction::North,
            (1, 1) => Direction::NorthEast,
            (1, 0) => Direction::East,
            (1, -1) => Direction::SouthEast,
            (0, -1) => Direction::South,
            (-1, -1) => Direction::SouthWest,
            (-1, 0) => Direction::West,
            (-1, 1) => Direction::NorthWest,
            _ => Direction::Center,
        }
    }

    /// The direction pointing the other way. `Center` is its own opposite.
    #[must_use]
    pub const fn opposite(self) -> Self {
        let (dx, dy) = self.delta();
        Self::from_delta(-dx, -dy)
    }

    /// Lowercase name used in logs and text recordings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::NorthEast => "northeast",
            Direction::East => "east",
            Direction::SouthEast => "southeast",
            Direction::South => "south",
            Direction::SouthWest => "southwest",
            Direction::West => "west",
            Direction::NorthWest => "northwest",
            Direction::Center => "center",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A position on the grid.
///
/// The canonical string form is `(x, y)`, e.g. `(3, 4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Location {
    /// Create a new location.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The location one step away in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_squared_to(self, other: Location) -> i64 {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        dx * dx + dy * dy
    }

    /// Closest compass direction from here towards `other`.
    #[must_use]
    pub const fn direction_to(self, other: Location) -> Direction {
        Direction::from_delta(other.x.saturating_sub(self.x), other.y.saturating_sub(self.y))
    }

    /// Whether `other` is this location or one of its eight neighbours.
    #[must_use]
    pub fn is_adjacent_to(self, other: Location) -> bool {
        self.distance_squared_to(other) <= 2
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Side a unit plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// First team.
    A,
    /// Second team.
    B,
    /// Belongs to nobody.
    Neutral,
}

impl Team {
    /// The other playing team. `Neutral` maps to itself.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
            Team::Neutral => Team::Neutral,
        }
    }
}

/// Kind of unit the callback is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Mobile general-purpose unit.
    Soldier,
    /// Mobile support unit.
    Mopper,
    /// Mobile area unit.
    Splasher,
    /// Stationary structure.
    Tower,
}

impl UnitKind {
    /// Whether units of this kind may request movement.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !matches!(self, UnitKind::Tower)
    }
}

/// Read-only snapshot of a unit, valid for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// Unit identity.
    pub id: UnitId,
    /// Owning team.
    pub team: Team,
    /// Unit kind.
    pub kind: UnitKind,
    /// Position at the start of the turn.
    pub location: Location,
    /// Turn number the snapshot was taken on.
    pub turn: u32,
}
