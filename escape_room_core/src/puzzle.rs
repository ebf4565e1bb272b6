use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Direction, EntityId, EntityKind, Position,
    entity::{Entity, Player, Transition, Weighted},
};

/// Recoverable gameplay failures. The message is the narrative shown to the agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid move: you cannot move {direction} from {from}.")]
    InvalidMove { direction: Direction, from: Position },
    #[error("There is no {name} here that you can pick up.")]
    ObjectNotFound { name: String },
    #[error("Your hands are full! Drop what you're carrying first.")]
    HandsFull,
    #[error("You are not carrying anything.")]
    NotCarrying,
    #[error("You aren't carrying a {name}.")]
    WrongItem { name: String },
}

/// A discrete state change caused by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ButtonPressed { button: EntityId, position: Position },
    ButtonReleased { button: EntityId, position: Position },
    Activated { target: EntityId },
    Deactivated { target: EntityId },
}

impl Event {
    /// Text the player perceives for this event, if any.
    pub fn narrative(&self) -> Option<&'static str> {
        match self {
            Event::ButtonPressed { .. } => Some(Transition::Pressed.narrative()),
            Event::ButtonReleased { .. } => Some(Transition::Released.narrative()),
            Event::Activated { .. } | Event::Deactivated { .. } => None,
        }
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub from: Position,
    pub to: Position,
    /// Leave events first, then enter events, each in grid order.
    pub events: Vec<Event>,
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<&str> = self.events.iter().filter_map(Event::narrative).collect();
        if lines.is_empty() {
            write!(f, "Moved to {}", self.to)
        } else {
            f.write_str(&lines.join("\n"))
        }
    }
}

/// Result of picking an object up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickUpOutcome {
    pub object: EntityId,
    pub kind: EntityKind,
    pub events: Vec<Event>,
}

impl fmt::Display for PickUpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "You now have the item {} in your inventory.", self.kind)
    }
}

/// Result of dropping the carried object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOutcome {
    pub object: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    pub events: Vec<Event>,
}

impl fmt::Display for DropOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You have dropped the {}. It is no longer in your inventory.",
            self.kind
        )
    }
}

/// A bounded grid with one player and a set of weight-sensitive objects.
///
/// Every entity lives in `entities` for the whole session. An entity is either
/// listed in `on_grid` or held in the player's inventory, never both.
#[derive(Debug, Clone)]
pub struct GridPuzzle {
    grid_size: (usize, usize),
    player: Player,
    entities: Vec<Entity>,
    on_grid: Vec<EntityId>,
    steps: u32,
}

impl GridPuzzle {
    /// Creates an empty puzzle with the player at the origin.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_size: (width, height),
            player: Player::new(Position::new(0, 0)),
            entities: Vec::new(),
            on_grid: Vec::new(),
            steps: 0,
        }
    }

    /// `(width, height)` of the grid.
    pub fn grid_size(&self) -> (usize, usize) {
        self.grid_size
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Successful moves so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Places a new object on the grid and returns its handle.
    pub fn add_object(&mut self, object: impl Into<Entity>) -> EntityId {
        let id = self.entities.len();
        self.entities.push(object.into());
        self.on_grid.push(id);
        id
    }

    /// Looks up any entity, on the grid or carried.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Objects lying on the grid, in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.on_grid.iter().map(|&id| (id, &self.entities[id]))
    }

    /// The carried object, if any.
    pub fn inventory(&self) -> Option<(EntityId, &Entity)> {
        self.player
            .inventory
            .map(|id| (id, &self.entities[id]))
    }

    /// Handles of the objects lying at `position`, in insertion order.
    pub fn get_objects_at(&self, position: Position) -> Vec<EntityId> {
        self.objects()
            .filter(|(_, entity)| entity.position() == position)
            .map(|(id, _)| id)
            .collect()
    }

    /// Resolves an object name the way the player sees it: the carried item
    /// first, then whatever lies on the player's own cell. Objects elsewhere on
    /// the grid are out of reach.
    pub fn get_object_by_name(&self, name: &str) -> Option<EntityId> {
        let kind = EntityKind::from_name(name)?;
        if let Some((id, entity)) = self.inventory() {
            if entity.kind() == kind {
                return Some(id);
            }
        }
        self.get_objects_at(self.player.position)
            .into_iter()
            .find(|&id| self.entities[id].kind() == kind)
    }

    /// Picks up the named object. The player's own weight stays on any
    /// button underfoot; a picked-up button loses its whole load.
    ///
    /// Fails without touching the world when nothing of that name is in
    /// reach or the player already carries something.
    pub fn equip(&mut self, name: &str) -> Result<PickUpOutcome, ActionError> {
        let id = self
            .get_object_by_name(name)
            .ok_or_else(|| ActionError::ObjectNotFound {
                name: name.to_string(),
            })?;
        if self.player.inventory.is_some() {
            return Err(ActionError::HandsFull);
        }

        let position = self.player.position;
        let weight = self.entities[id].weight();
        let mut events = self.shift_weight(position, weight, false);

        self.on_grid.retain(|&other| other != id);
        self.player.inventory = Some(id);
        // A carried button rests on nothing.
        let released = self.entities[id].as_button_mut().and_then(|button| {
            let load = button.current_weight();
            button.remove_weight(load)
        });
        if let Some(transition) = released {
            events.extend(self.propagate(id, transition));
        }
        let kind = self.entities[id].kind();
        debug!(object = id, %kind, %position, "picked_up");

        Ok(PickUpOutcome {
            object: id,
            kind,
            events,
        })
    }

    /// Puts the carried object down on the player's cell. A dropped button
    /// is loaded with everything already resting there, player included.
    pub fn drop(&mut self, name: &str) -> Result<DropOutcome, ActionError> {
        let id = self.player.inventory.ok_or(ActionError::NotCarrying)?;
        let kind = self.entities[id].kind();
        if EntityKind::from_name(name) != Some(kind) {
            return Err(ActionError::WrongItem {
                name: name.to_string(),
            });
        }

        let position = self.player.position;
        let weight = self.entities[id].weight();
        let mut events = self.shift_weight(position, weight, true);

        self.player.inventory = None;
        self.entities[id].set_position(position);
        self.on_grid.push(id);
        // A dropped button starts out carrying everything already on its cell.
        if self.entities[id].as_button().is_some() {
            let load = self.load_at(position, id);
            let pressed = self.entities[id]
                .as_button_mut()
                .and_then(|button| button.add_weight(load));
            if let Some(transition) = pressed {
                events.extend(self.propagate(id, transition));
            }
        }
        debug!(object = id, %kind, %position, "dropped");

        Ok(DropOutcome {
            object: id,
            kind,
            position,
            events,
        })
    }

    /// Moves the player one cell and notifies the buttons it leaves and
    /// enters. A move off the grid is rejected and costs no step.
    pub fn move_player(&mut self, direction: Direction) -> Result<MoveOutcome, ActionError> {
        let from = self.player.position;
        if !self.player.try_move(direction, self.grid_size) {
            debug!(%direction, %from, "move_rejected");
            return Err(ActionError::InvalidMove { direction, from });
        }
        self.steps += 1;
        let to = self.player.position;
        debug!(%direction, %from, %to, steps = self.steps, "moved");

        let events = self.handle_player_movement(from, to);
        Ok(MoveOutcome { from, to, events })
    }

    /// Notifies objects at `old` that the player left, then objects at `new`
    /// that the player arrived.
    pub fn handle_player_movement(&mut self, old: Position, new: Position) -> Vec<Event> {
        let mut events = Vec::new();

        for id in self.get_objects_at(old) {
            let transition = match &mut self.entities[id] {
                Entity::Button(button) => button.on_leave(&self.player),
                Entity::Door(_) | Entity::Rock(_) => None,
            };
            if let Some(transition) = transition {
                events.extend(self.propagate(id, transition));
            }
        }

        for id in self.get_objects_at(new) {
            let transition = match &mut self.entities[id] {
                Entity::Button(button) => button.on_enter(&self.player),
                Entity::Door(_) | Entity::Rock(_) => None,
            };
            if let Some(transition) = transition {
                events.extend(self.propagate(id, transition));
            }
        }

        events
    }

    /// Direct interaction with an object. Narrates only.
    pub fn interact(&self, id: EntityId) -> Option<String> {
        self.entity(id).map(|entity| entity.interact(&self.player))
    }

    /// True when the first door on the grid is open and the player stands on it.
    pub fn is_solved(&self) -> bool {
        self.objects()
            .find_map(|(_, entity)| entity.as_door())
            .is_some_and(|door| door.open && door.position == self.player.position)
    }

    /// One-line summary of position, steps and inventory.
    pub fn get_status(&self) -> String {
        let inventory = self
            .inventory()
            .map(|(_, entity)| entity.kind().as_str())
            .unwrap_or("empty");
        format!(
            "Player at {}, Steps: {}, Inventory: {}",
            self.player.position, self.steps, inventory
        )
    }

    /// Weight resting on `position`: the player if standing there, plus every
    /// object on the grid at that cell other than `except`.
    fn load_at(&self, position: Position, except: EntityId) -> u32 {
        let player = if self.player.position == position {
            self.player.weight()
        } else {
            0
        };
        self.objects()
            .filter(|&(id, entity)| id != except && entity.position() == position)
            .map(|(_, entity)| entity.weight())
            .fold(player, u32::saturating_add)
    }

    /// Adds (or removes) `weight` on every button at `position`.
    fn shift_weight(&mut self, position: Position, weight: u32, adding: bool) -> Vec<Event> {
        let mut events = Vec::new();
        for id in self.get_objects_at(position) {
            let transition = match &mut self.entities[id] {
                Entity::Button(button) if adding => button.add_weight(weight),
                Entity::Button(button) => button.remove_weight(weight),
                Entity::Door(_) | Entity::Rock(_) => None,
            };
            if let Some(transition) = transition {
                events.extend(self.propagate(id, transition));
            }
        }
        events
    }

    /// Fans a button transition out to the button's linked objects. Linked
    /// objects are not buttons' occupants, so nothing cascades further.
    fn propagate(&mut self, button_id: EntityId, transition: Transition) -> Vec<Event> {
        let Some(button) = self.entities[button_id].as_button() else {
            return Vec::new();
        };
        let position = button.position;
        let linked = button.linked().to_vec();

        let mut events = vec![match transition {
            Transition::Pressed => Event::ButtonPressed {
                button: button_id,
                position,
            },
            Transition::Released => Event::ButtonReleased {
                button: button_id,
                position,
            },
        }];
        info!(button = button_id, %position, ?transition, "button_transition");

        for target in linked {
            let Some(entity) = self.entities.get_mut(target) else {
                continue;
            };
            let reacted = match transition {
                Transition::Pressed => entity.activate(),
                Transition::Released => entity.deactivate(),
            };
            if !reacted {
                debug!(button = button_id, target, kind = %entity.kind(), "link_ignored");
                continue;
            }
            info!(button = button_id, target, ?transition, "linked_object_toggled");
            events.push(match transition {
                Transition::Pressed => Event::Activated { target },
                Transition::Released => Event::Deactivated { target },
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Button, Door, PLAYER_WEIGHT, ROCK_WEIGHT, Rock};

    /// The 3x3 room: door (2,0), button (1,1) threshold 90 linked to the door,
    /// rock (0,2).
    fn room() -> (GridPuzzle, EntityId, EntityId, EntityId) {
        let mut puzzle = GridPuzzle::new(3, 3);
        let door = puzzle.add_object(Door::new(Position::new(2, 0)));
        let button = puzzle.add_object(Button::new(Position::new(1, 1), 90).with_link(door));
        let rock = puzzle.add_object(Rock::new(Position::new(0, 2), ROCK_WEIGHT));
        (puzzle, door, button, rock)
    }

    fn button(puzzle: &GridPuzzle, id: EntityId) -> &Button {
        puzzle.entity(id).and_then(Entity::as_button).unwrap()
    }

    fn door_open(puzzle: &GridPuzzle, id: EntityId) -> bool {
        puzzle.entity(id).and_then(Entity::as_door).unwrap().open
    }

    #[test]
    fn successful_move_counts_a_step() {
        let (mut puzzle, ..) = room();
        let outcome = puzzle.move_player(Direction::Up).unwrap();
        assert_eq!(outcome.from, Position::new(0, 0));
        assert_eq!(outcome.to, Position::new(0, 1));
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.to_string(), "Moved to (0, 1)");
        assert_eq!(puzzle.steps(), 1);
    }

    #[test]
    fn rejected_move_leaves_state_alone() {
        let (mut puzzle, ..) = room();
        let err = puzzle.move_player(Direction::Down).unwrap_err();
        assert_eq!(
            err,
            ActionError::InvalidMove {
                direction: Direction::Down,
                from: Position::new(0, 0)
            }
        );
        assert_eq!(puzzle.steps(), 0);
        assert_eq!(puzzle.player().position, Position::new(0, 0));
    }

    #[test]
    fn lookup_is_scoped_to_the_players_cell() {
        let (mut puzzle, _, _, rock) = room();
        assert_eq!(puzzle.get_object_by_name("rock"), None);
        assert_eq!(
            puzzle.equip("rock").unwrap_err(),
            ActionError::ObjectNotFound {
                name: "rock".to_string()
            }
        );

        puzzle.move_player(Direction::Up).unwrap();
        puzzle.move_player(Direction::Up).unwrap();
        assert_eq!(puzzle.get_object_by_name("ROCK"), Some(rock));
    }

    #[test]
    fn picking_up_moves_the_object_into_the_inventory() {
        let (mut puzzle, _, _, rock) = room();
        puzzle.move_player(Direction::Up).unwrap();
        puzzle.move_player(Direction::Up).unwrap();

        let outcome = puzzle.equip("rock").unwrap();
        assert_eq!(outcome.object, rock);
        assert_eq!(
            outcome.to_string(),
            "You now have the item rock in your inventory."
        );
        assert!(puzzle.get_objects_at(Position::new(0, 2)).is_empty());
        assert_eq!(puzzle.player().inventory, Some(rock));
        assert_eq!(puzzle.get_status(), "Player at (0, 2), Steps: 2, Inventory: rock");
    }

    #[test]
    fn second_pick_up_fails_without_moving_anything() {
        let mut puzzle = GridPuzzle::new(2, 2);
        let first = puzzle.add_object(Rock::new(Position::new(0, 0), 10));
        let second = puzzle.add_object(Rock::new(Position::new(0, 0), 20));

        puzzle.equip("rock").unwrap();
        assert_eq!(puzzle.player().inventory, Some(first));
        assert_eq!(puzzle.equip("rock").unwrap_err(), ActionError::HandsFull);
        assert_eq!(puzzle.player().inventory, Some(first));
        assert_eq!(puzzle.get_objects_at(Position::new(0, 0)), vec![second]);
    }

    #[test]
    fn drop_requires_the_matching_carried_item() {
        let (mut puzzle, _, _, rock) = room();
        assert_eq!(puzzle.drop("rock").unwrap_err(), ActionError::NotCarrying);

        puzzle.move_player(Direction::Up).unwrap();
        puzzle.move_player(Direction::Up).unwrap();
        puzzle.equip("rock").unwrap();
        assert_eq!(
            puzzle.drop("door").unwrap_err(),
            ActionError::WrongItem {
                name: "door".to_string()
            }
        );

        puzzle.move_player(Direction::Right).unwrap();
        let outcome = puzzle.drop("rock").unwrap();
        assert_eq!(outcome.position, Position::new(1, 2));
        assert_eq!(puzzle.player().inventory, None);
        assert_eq!(puzzle.get_objects_at(Position::new(1, 2)), vec![rock]);
        assert_eq!(
            puzzle.entity(rock).map(Entity::position),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn standing_on_the_button_opens_the_door_until_the_player_leaves() {
        let (mut puzzle, door, button_id, _) = room();
        puzzle.move_player(Direction::Up).unwrap();

        let outcome = puzzle.move_player(Direction::Right).unwrap();
        assert_eq!(
            outcome.events,
            vec![
                Event::ButtonPressed {
                    button: button_id,
                    position: Position::new(1, 1)
                },
                Event::Activated { target: door },
            ]
        );
        assert_eq!(outcome.to_string(), "You hear a click. The button is pressed.");
        assert_eq!(button(&puzzle, button_id).current_weight(), PLAYER_WEIGHT);
        assert!(door_open(&puzzle, door));

        let outcome = puzzle.move_player(Direction::Right).unwrap();
        assert_eq!(
            outcome.to_string(),
            "You hear another click. The button is unpressed."
        );
        assert_eq!(button(&puzzle, button_id).current_weight(), 0);
        assert!(!door_open(&puzzle, door));
    }

    #[test]
    fn lifting_a_rock_off_a_button_releases_it() {
        let mut puzzle = GridPuzzle::new(2, 1);
        let door = puzzle.add_object(Door::new(Position::new(1, 0)));
        let button_id =
            puzzle.add_object(Button::new(Position::new(0, 0), 200).with_link(door));
        puzzle.add_object(Rock::new(Position::new(1, 0), ROCK_WEIGHT));

        // Walk over, fetch the rock, come back and drop it: 150 + 100 >= 200.
        puzzle.move_player(Direction::Right).unwrap();
        puzzle.equip("rock").unwrap();
        puzzle.move_player(Direction::Left).unwrap();
        assert!(!button(&puzzle, button_id).is_pressed());

        let dropped = puzzle.drop("rock").unwrap();
        assert_eq!(dropped.events.len(), 2);
        assert!(door_open(&puzzle, door));

        let lifted = puzzle.equip("rock").unwrap();
        assert_eq!(
            lifted.events,
            vec![
                Event::ButtonReleased {
                    button: button_id,
                    position: Position::new(0, 0)
                },
                Event::Deactivated { target: door },
            ]
        );
        assert_eq!(button(&puzzle, button_id).current_weight(), PLAYER_WEIGHT);
        assert!(!door_open(&puzzle, door));
    }

    #[test]
    fn failed_pick_up_leaves_a_loaded_button_alone() {
        let mut puzzle = GridPuzzle::new(3, 1);
        let door = puzzle.add_object(Door::new(Position::new(2, 0)));
        let button_id = puzzle.add_object(Button::new(Position::new(1, 0), 90).with_link(door));
        let first = puzzle.add_object(Rock::new(Position::new(0, 0), ROCK_WEIGHT));
        let second = puzzle.add_object(Rock::new(Position::new(0, 0), ROCK_WEIGHT));

        // Park the first rock on the button, then come back for the second.
        puzzle.equip("rock").unwrap();
        puzzle.move_player(Direction::Right).unwrap();
        puzzle.drop("rock").unwrap();
        puzzle.move_player(Direction::Left).unwrap();
        puzzle.equip("rock").unwrap();
        puzzle.move_player(Direction::Right).unwrap();
        assert_eq!(puzzle.player().inventory, Some(second));
        assert_eq!(
            button(&puzzle, button_id).current_weight(),
            PLAYER_WEIGHT + ROCK_WEIGHT
        );

        assert_eq!(puzzle.equip("rock").unwrap_err(), ActionError::HandsFull);
        assert_eq!(
            button(&puzzle, button_id).current_weight(),
            PLAYER_WEIGHT + ROCK_WEIGHT
        );
        assert!(button(&puzzle, button_id).is_pressed());
        assert!(door_open(&puzzle, door));
        assert_eq!(puzzle.player().inventory, Some(second));
        assert_eq!(
            puzzle.get_objects_at(Position::new(1, 0)),
            vec![button_id, first]
        );
    }

    #[test]
    fn a_carried_button_holds_no_weight_until_dropped() {
        let (mut puzzle, door, button_id, _) = room();
        puzzle.move_player(Direction::Up).unwrap();
        puzzle.move_player(Direction::Right).unwrap();
        assert!(door_open(&puzzle, door));

        let lifted = puzzle.equip("button").unwrap();
        assert_eq!(
            lifted.events,
            vec![
                Event::ButtonReleased {
                    button: button_id,
                    position: Position::new(1, 1)
                },
                Event::Deactivated { target: door },
            ]
        );
        assert_eq!(button(&puzzle, button_id).current_weight(), 0);
        assert!(!button(&puzzle, button_id).is_pressed());
        assert!(!door_open(&puzzle, door));

        let walked = puzzle.move_player(Direction::Right).unwrap();
        assert!(walked.events.is_empty());
        assert!(!door_open(&puzzle, door));

        let dropped = puzzle.drop("button").unwrap();
        assert_eq!(
            dropped.events,
            vec![
                Event::ButtonPressed {
                    button: button_id,
                    position: Position::new(2, 1)
                },
                Event::Activated { target: door },
            ]
        );
        assert_eq!(button(&puzzle, button_id).current_weight(), PLAYER_WEIGHT);
        assert!(door_open(&puzzle, door));

        let left = puzzle.move_player(Direction::Left).unwrap();
        assert_eq!(left.events.len(), 2);
        assert_eq!(button(&puzzle, button_id).current_weight(), 0);
        assert!(!door_open(&puzzle, door));
    }

    #[test]
    fn a_button_dropped_onto_a_rock_counts_the_rock() {
        let mut puzzle = GridPuzzle::new(2, 1);
        let door = puzzle.add_object(Door::new(Position::new(0, 0)));
        let button_id = puzzle.add_object(Button::new(Position::new(0, 0), 200).with_link(door));
        puzzle.add_object(Rock::new(Position::new(1, 0), ROCK_WEIGHT));

        puzzle.equip("button").unwrap();
        puzzle.move_player(Direction::Right).unwrap();
        puzzle.drop("button").unwrap();
        assert_eq!(
            button(&puzzle, button_id).current_weight(),
            PLAYER_WEIGHT + ROCK_WEIGHT
        );
        assert!(door_open(&puzzle, door));
    }

    #[test]
    fn links_to_objects_without_activation_are_skipped() {
        let mut puzzle = GridPuzzle::new(2, 1);
        let rock = puzzle.add_object(Rock::new(Position::new(0, 0), 1));
        let button_id = puzzle.add_object(Button::new(Position::new(1, 0), 10).with_link(rock));

        let outcome = puzzle.move_player(Direction::Right).unwrap();
        assert_eq!(
            outcome.events,
            vec![Event::ButtonPressed {
                button: button_id,
                position: Position::new(1, 0)
            }]
        );
    }

    #[test]
    fn solved_needs_an_open_door_under_the_player() {
        let (mut puzzle, door, ..) = room();
        assert!(!puzzle.is_solved());

        for direction in [Direction::Right, Direction::Right] {
            puzzle.move_player(direction).unwrap();
        }
        assert_eq!(puzzle.player().position, Position::new(2, 0));
        assert!(!puzzle.is_solved());
        assert_eq!(
            puzzle.interact(door).as_deref(),
            Some("The door is closed. Find a way to open it.")
        );
        assert!(!door_open(&puzzle, door));
    }

    #[test]
    fn empty_puzzle_is_never_solved() {
        let puzzle = GridPuzzle::new(1, 1);
        assert!(!puzzle.is_solved());
        assert_eq!(puzzle.get_status(), "Player at (0, 0), Steps: 0, Inventory: empty");
    }
}
