use serde::{Deserialize, Serialize};

use crate::{Direction, EntityId, EntityKind, Position};

/// Weight the player contributes when standing on a button.
pub const PLAYER_WEIGHT: u32 = 150;

/// Default weight of a rock, in pounds.
pub const ROCK_WEIGHT: u32 = 100;

/// Anything that can press down on a button.
///
/// Objects without a meaningful weight report zero.
pub trait Weighted {
    fn weight(&self) -> u32;
}

/// A door that is opened and closed remotely by linked buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub position: Position,
    pub open: bool,
}

impl Door {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            open: false,
        }
    }

    pub fn activate(&mut self) {
        self.open = true;
    }

    pub fn deactivate(&mut self) {
        self.open = false;
    }

    /// Describes the door to a player. Never changes its state: only buttons open doors.
    pub fn interact(&self, player: &Player) -> &'static str {
        if player.position != self.position {
            "You are too far away to interact with the door."
        } else if self.open {
            "You pass through the open door."
        } else {
            "The door is closed. Find a way to open it."
        }
    }
}

/// Edge reported by a button whose load crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Pressed,
    Released,
}

impl Transition {
    pub fn narrative(&self) -> &'static str {
        match self {
            Transition::Pressed => "You hear a click. The button is pressed.",
            Transition::Released => "You hear another click. The button is unpressed.",
        }
    }
}

/// A pressure plate that tracks the weight resting on its cell.
///
/// `pressed` follows the load eagerly: it becomes true when the load reaches
/// the threshold and false as soon as it falls below it. Linked objects are
/// held as handles; the puzzle dispatches the actual activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub position: Position,
    pressed: bool,
    weight_threshold: u32,
    current_weight: u32,
    linked: Vec<EntityId>,
}

impl Button {
    /// Creates an unpressed, unloaded button.
    ///
    /// # Panics
    ///
    /// Panics if `weight_threshold` is zero.
    pub fn new(position: Position, weight_threshold: u32) -> Self {
        assert!(weight_threshold > 0, "Button weight threshold must be positive");
        Self {
            position,
            pressed: false,
            weight_threshold,
            current_weight: 0,
            linked: Vec::new(),
        }
    }

    /// Builder-style variant of [`Button::link`].
    pub fn with_link(mut self, target: EntityId) -> Self {
        self.link(target);
        self
    }

    /// Wires another object to this button's press and release.
    pub fn link(&mut self, target: EntityId) {
        self.linked.push(target);
    }

    pub fn linked(&self) -> &[EntityId] {
        &self.linked
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn weight_threshold(&self) -> u32 {
        self.weight_threshold
    }

    pub fn current_weight(&self) -> u32 {
        self.current_weight
    }

    /// Adds load, pressing the button once the threshold is reached.
    pub fn add_weight(&mut self, weight: u32) -> Option<Transition> {
        self.current_weight = self.current_weight.saturating_add(weight);
        if self.current_weight >= self.weight_threshold {
            self.press()
        } else {
            None
        }
    }

    /// Removes load from the button, clamping at zero.
    pub fn remove_weight(&mut self, weight: u32) -> Option<Transition> {
        self.current_weight = self.current_weight.saturating_sub(weight);
        if self.current_weight < self.weight_threshold {
            self.unpress()
        } else {
            None
        }
    }

    /// Returns `None` when the button was already down.
    pub fn press(&mut self) -> Option<Transition> {
        if self.pressed {
            return None;
        }
        self.pressed = true;
        Some(Transition::Pressed)
    }

    /// Returns `None` when the button was already up.
    pub fn unpress(&mut self) -> Option<Transition> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        Some(Transition::Released)
    }

    pub fn on_enter(&mut self, occupant: &impl Weighted) -> Option<Transition> {
        self.add_weight(occupant.weight())
    }

    pub fn on_leave(&mut self, occupant: &impl Weighted) -> Option<Transition> {
        self.remove_weight(occupant.weight())
    }
}

/// An inert, heavy object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rock {
    pub position: Position,
    pub weight: u32,
}

impl Rock {
    pub fn new(position: Position, weight: u32) -> Self {
        Self { position, weight }
    }
}

impl Weighted for Rock {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// Any object that can lie on the grid or be carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Door(Door),
    Button(Button),
    Rock(Rock),
}

impl Entity {
    /// The name agents use for this object.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Door(_) => EntityKind::Door,
            Entity::Button(_) => EntityKind::Button,
            Entity::Rock(_) => EntityKind::Rock,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Entity::Door(door) => door.position,
            Entity::Button(button) => button.position,
            Entity::Rock(rock) => rock.position,
        }
    }

    /// Relocates the object. Bounds are the puzzle's concern.
    pub fn set_position(&mut self, position: Position) -> Position {
        match self {
            Entity::Door(door) => door.position = position,
            Entity::Button(button) => button.position = position,
            Entity::Rock(rock) => rock.position = position,
        }
        position
    }

    /// Reacts to a linked button going down. Returns whether the object has
    /// an activation behavior at all.
    pub fn activate(&mut self) -> bool {
        match self {
            Entity::Door(door) => {
                door.activate();
                true
            }
            Entity::Button(_) | Entity::Rock(_) => false,
        }
    }

    pub fn deactivate(&mut self) -> bool {
        match self {
            Entity::Door(door) => {
                door.deactivate();
                true
            }
            Entity::Button(_) | Entity::Rock(_) => false,
        }
    }

    pub fn interact(&self, player: &Player) -> String {
        match self {
            Entity::Door(door) => door.interact(player).to_string(),
            Entity::Button(button) if button.position == player.position => {
                if button.pressed {
                    "The button is pressed down.".to_string()
                } else {
                    "There is a button on the floor. Enough weight will press it.".to_string()
                }
            }
            Entity::Rock(rock) if rock.position == player.position => {
                format!("There is a rock here. It weighs {} pounds.", rock.weight)
            }
            Entity::Button(_) | Entity::Rock(_) => {
                format!("You are too far away to interact with the {}.", self.kind())
            }
        }
    }

    /// The door inside, if this is one.
    pub fn as_door(&self) -> Option<&Door> {
        match self {
            Entity::Door(door) => Some(door),
            _ => None,
        }
    }

    pub fn as_button(&self) -> Option<&Button> {
        match self {
            Entity::Button(button) => Some(button),
            _ => None,
        }
    }

    pub fn as_button_mut(&mut self) -> Option<&mut Button> {
        match self {
            Entity::Button(button) => Some(button),
            _ => None,
        }
    }
}

impl Weighted for Entity {
    fn weight(&self) -> u32 {
        match self {
            Entity::Rock(rock) => rock.weight,
            Entity::Door(_) | Entity::Button(_) => 0,
        }
    }
}

impl From<Door> for Entity {
    fn from(door: Door) -> Self {
        Entity::Door(door)
    }
}

impl From<Button> for Entity {
    fn from(button: Button) -> Self {
        Entity::Button(button)
    }
}

impl From<Rock> for Entity {
    fn from(rock: Rock) -> Self {
        Entity::Rock(rock)
    }
}

/// The single player of a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub position: Position,
    /// Single inventory slot, holding a handle into the puzzle's entity table.
    pub inventory: Option<EntityId>,
    pub weight: u32,
}

impl Player {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            inventory: None,
            weight: PLAYER_WEIGHT,
        }
    }

    /// Moves one cell in `direction` if the target lies inside a grid of
    /// `(width, height)`. Returns whether the player moved.
    pub fn try_move(&mut self, direction: Direction, grid_size: (usize, usize)) -> bool {
        let (width, height) = grid_size;
        let Position { x, y } = self.position;
        let target = match direction {
            Direction::Up if y + 1 < height => Position::new(x, y + 1),
            Direction::Down if y > 0 => Position::new(x, y - 1),
            Direction::Left if x > 0 => Position::new(x - 1, y),
            Direction::Right if x + 1 < width => Position::new(x + 1, y),
            _ => return false,
        };
        self.position = target;
        true
    }
}

impl Weighted for Player {
    fn weight(&self) -> u32 {
        self.weight
    }
}
