use std::fmt;

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod entity;
pub mod level;
pub mod map;
pub mod puzzle;
pub mod render;
pub mod session;

/// Handle into a puzzle's entity table.
///
/// Handles stay valid for the lifetime of the puzzle: entities move between the
/// grid and the player's inventory but are never removed from the table.
pub type EntityId = usize;

/// Represents a 2D coordinate. `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four grid directions a player can move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in the order they are offered to agents.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Case-insensitive lookup of a direction by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of object types that can exist in a puzzle.
///
/// Agents refer to objects by these names (`pick_up rock`), so the lowercase
/// name doubles as the command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Door,
    Button,
    Rock,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Door, EntityKind::Button, EntityKind::Rock];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Door => "door",
            EntityKind::Button => "button",
            EntityKind::Rock => "rock",
        }
    }

    /// Case-insensitive lookup of an object type by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
