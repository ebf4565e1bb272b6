//! Plain-text views of a puzzle, as handed to agents.

use tracing::warn;

use crate::{entity::Entity, map::Grid, puzzle::GridPuzzle};

pub const LEGEND: &str = "Legend: P=Player, d=Closed Door, D=Open Door, b=Unpressed Button, B=Pressed Button, R=Rock";

pub const EMPTY: char = '.';
pub const PLAYER: char = 'P';

/// Map glyph for an object, following [`LEGEND`].
pub fn symbol(entity: &Entity) -> char {
    match entity {
        Entity::Door(door) if door.open => 'D',
        Entity::Door(_) => 'd',
        Entity::Button(button) if button.is_pressed() => 'B',
        Entity::Button(_) => 'b',
        Entity::Rock(_) => 'R',
    }
}

/// One character per cell. Later objects cover earlier ones and the player
/// covers everything.
pub fn symbol_grid(puzzle: &GridPuzzle) -> Grid<char> {
    let (width, height) = puzzle.grid_size();
    let mut grid = Grid::filled(width, height, EMPTY);
    let placements = puzzle
        .objects()
        .map(|(_, entity)| (entity.position(), symbol(entity)))
        .chain(std::iter::once((puzzle.player().position, PLAYER)));
    for (position, glyph) in placements {
        if let Err(err) = grid.set(position, glyph) {
            warn!(error = %err, "object outside the grid left out of rendering");
        }
    }
    grid
}

/// Rows top to bottom (descending y), cells separated by a space.
pub fn grid(puzzle: &GridPuzzle) -> String {
    symbol_grid(puzzle)
        .rows_top_down()
        .map(|row| {
            row.iter()
                .map(char::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per object on the grid, with its position and state.
pub fn objects(puzzle: &GridPuzzle) -> String {
    let mut lines = vec!["Objects in puzzle:".to_string()];
    for (_, entity) in puzzle.objects() {
        match entity {
            Entity::Door(door) => lines.push(format!(
                "- Door at {}: {}",
                door.position,
                if door.open { "Open" } else { "Closed" }
            )),
            Entity::Button(button) => {
                lines.push(format!(
                    "- Button at {}: {}",
                    button.position,
                    if button.is_pressed() { "Pressed" } else { "Unpressed" }
                ));
                lines.push(format!("  Weight threshold: {}", button.weight_threshold()));
            }
            Entity::Rock(rock) => {
                lines.push(format!("- Rock at {}: Weight={}", rock.position, rock.weight))
            }
        }
    }
    lines.join("\n")
}

pub fn player(puzzle: &GridPuzzle) -> String {
    format!("Player Status:\n{}", puzzle.get_status())
}

/// Everything an agent needs to see before choosing its next action.
pub fn state(puzzle: &GridPuzzle) -> String {
    [
        format!("Puzzle State:\n{LEGEND}\n{}", grid(puzzle)),
        objects(puzzle),
        player(puzzle),
    ]
    .join("\n")
}

/// The level's `(command, description)` menu as text.
pub fn action_menu(entries: &[(&str, &str)]) -> String {
    let mut lines = vec!["Available Actions:".to_string()];
    lines.extend(
        entries
            .iter()
            .map(|(command, description)| format!("- {command}: {description}")),
    );
    lines.join("\n")
}
