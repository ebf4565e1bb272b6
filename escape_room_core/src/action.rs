use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Direction,
    puzzle::{ActionError, GridPuzzle},
};

const HELP: &str = "Available actions:
1. Movement: \"move <direction>\" where direction is up/down/left/right.
2. Pick up: \"pick_up <object>\" where you stand on the same position as the object.
3. Drop: \"drop <object>\" for the object in your inventory.

Examples:
- move up
- pick_up rock
- drop rock";

/// Why a line of text could not be turned into an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(String),
    #[error("unknown direction '{0}'")]
    UnknownDirection(String),
}

/// A typed player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move(Direction),
    /// Object names are resolved by the puzzle, so unknown names are kept as typed.
    PickUp(String),
    Drop(String),
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        let mut parts = lowered.split_whitespace();
        let command = parts.next().ok_or(ParseError::Empty)?;
        if !matches!(command, "move" | "pick_up" | "drop") {
            return Err(ParseError::UnknownCommand(command.to_string()));
        }
        let argument = parts
            .next()
            .ok_or_else(|| ParseError::MissingArgument(command.to_string()))?;
        match command {
            "move" => Direction::from_name(argument)
                .map(Action::Move)
                .ok_or_else(|| ParseError::UnknownDirection(argument.to_string())),
            "pick_up" => Ok(Action::PickUp(argument.to_string())),
            _ => Ok(Action::Drop(argument.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(direction) => write!(f, "move {direction}"),
            Action::PickUp(object) => write!(f, "pick_up {object}"),
            Action::Drop(object) => write!(f, "drop {object}"),
        }
    }
}

/// Executes text commands against a puzzle and narrates the result.
///
/// Gameplay mistakes come back as text, never as errors.
pub struct ActionHandler<'a> {
    puzzle: &'a mut GridPuzzle,
}

impl<'a> ActionHandler<'a> {
    pub fn new(puzzle: &'a mut GridPuzzle) -> Self {
        Self { puzzle }
    }

    /// Parses and runs one line of input. Parse failures come back with the
    /// help text attached.
    pub fn execute(&mut self, action_text: &str) -> String {
        match action_text.parse::<Action>() {
            Ok(action) => self.dispatch(action),
            Err(err) => {
                debug!(input = action_text, error = %err, "action_parse_failed");
                format!("Invalid action format: {action_text}\n{HELP}")
            }
        }
    }

    /// Runs an already parsed action.
    pub fn dispatch(&mut self, action: Action) -> String {
        debug!(%action, "dispatch");
        match action {
            Action::Move(direction) => narrate(self.puzzle.move_player(direction)),
            Action::PickUp(object) => narrate(self.puzzle.equip(&object)),
            Action::Drop(object) => narrate(self.puzzle.drop(&object)),
        }
    }

    pub fn get_available_actions(&self) -> Vec<String> {
        available_actions(self.puzzle)
    }

    pub fn help() -> &'static str {
        HELP
    }
}

/// Commands that make sense from the player's current cell: every move, a
/// pick-up per object type underfoot, and a drop for the carried item.
pub fn available_actions(puzzle: &GridPuzzle) -> Vec<String> {
    let mut actions: Vec<String> = Direction::ALL
        .iter()
        .map(|direction| Action::Move(*direction).to_string())
        .collect();

    let mut seen = Vec::new();
    for id in puzzle.get_objects_at(puzzle.player().position) {
        let Some(kind) = puzzle.entity(id).map(|entity| entity.kind()) else {
            continue;
        };
        if !seen.contains(&kind) {
            seen.push(kind);
            actions.push(Action::PickUp(kind.to_string()).to_string());
        }
    }

    if let Some((_, carried)) = puzzle.inventory() {
        actions.push(Action::Drop(carried.kind().to_string()).to_string());
    }

    actions
}

fn narrate<T: fmt::Display>(result: Result<T, ActionError>) -> String {
    match result {
        Ok(outcome) => outcome.to_string(),
        Err(err) => err.to_string(),
    }
}
