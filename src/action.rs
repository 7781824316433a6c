//! State-changing requests a callback may issue.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::unit::Direction;

/// A one-shot request for the host to change world state.
///
/// At most one action is accepted per turn; the host applies it when the
/// callback returns normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Action {
    /// Step one cell in the given direction.
    Move(Direction),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(direction) => write!(f, "move {direction}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Move(Direction::NorthWest).to_string(), "move northwest");
    }
}
