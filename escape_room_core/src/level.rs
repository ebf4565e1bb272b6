use tracing::info;

use crate::{
    Position,
    entity::{Button, Door, ROCK_WEIGHT, Rock},
    puzzle::GridPuzzle,
};

/// A `(command, description)` pair shown to agents before they start.
pub type MenuEntry = (&'static str, &'static str);

/// Failure to build a level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("Level {0} does not exist.")]
    UnknownLevel(u32),
}

/// A freshly built puzzle together with its static action menu.
#[derive(Debug, Clone)]
pub struct Level {
    pub number: u32,
    pub puzzle: GridPuzzle,
    pub actions: Vec<MenuEntry>,
    pub solution: Option<&'static str>,
}

impl Level {
    /// Splits the level into its puzzle and menu.
    pub fn into_parts(self) -> (GridPuzzle, Vec<MenuEntry>) {
        (self.puzzle, self.actions)
    }

    /// Whether the puzzle, in its current state, counts as solved.
    pub fn validate_solution(&self) -> bool {
        self.puzzle.is_solved()
    }
}

/// Level numbers that [`get_level`] knows how to build.
pub const LEVELS: [u32; 2] = [1, 2];

/// Builds a new, independent instance of level `number`.
pub fn get_level(number: u32) -> Result<Level, LevelError> {
    let level = match number {
        1 => level_one(),
        2 => level_two(),
        other => return Err(LevelError::UnknownLevel(other)),
    };
    let (width, height) = level.puzzle.grid_size();
    info!(level = number, width, height, "level_built");
    Ok(level)
}

const COMMON_ACTIONS: [MenuEntry; 6] = [
    ("status", "Will not impact number of steps. Shows position, inventory items, and steps so far."),
    ("solved", "Will not impact number of steps. Checks if the puzzle is solved."),
    ("move up", "Will increase the y coordinate by 1."),
    ("move down", "Will decrease the y coordinate by 1."),
    ("move left", "Will decrease the x coordinate by 1."),
    ("move right", "Will increase the x coordinate by 1."),
];

fn rock_actions() -> Vec<MenuEntry> {
    let mut actions = COMMON_ACTIONS.to_vec();
    actions.push(("pick_up rock", "Picks up the rock if you stand on it."));
    actions.push(("drop rock", "Drops the rock you are carrying."));
    actions
}

/// One button opens the door, but only while something heavy rests on it.
fn level_one() -> Level {
    let mut puzzle = GridPuzzle::new(3, 3);
    let door = puzzle.add_object(Door::new(Position::new(2, 0)));
    puzzle.add_object(Button::new(Position::new(1, 1), 90).with_link(door));
    puzzle.add_object(Rock::new(Position::new(0, 2), ROCK_WEIGHT));

    Level {
        number: 1,
        puzzle,
        actions: rock_actions(),
        solution: Some(
            "Move to the rock, pick it up, move to the button, drop the rock on the button \
             to keep it pressed, move to the door",
        ),
    }
}

/// Same idea on a larger grid, with a decoy button wired to nothing.
fn level_two() -> Level {
    let mut puzzle = GridPuzzle::new(4, 4);
    let door = puzzle.add_object(Door::new(Position::new(3, 3)));
    puzzle.add_object(Button::new(Position::new(1, 1), 90).with_link(door));
    puzzle.add_object(Button::new(Position::new(2, 2), 90));
    puzzle.add_object(Rock::new(Position::new(0, 2), ROCK_WEIGHT));

    Level {
        number: 2,
        puzzle,
        actions: rock_actions(),
        solution: None,
    }
}
