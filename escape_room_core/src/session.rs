use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    action::{ActionHandler, available_actions},
    agent::{Agent, AgentView},
    level::{Level, LevelError, MenuEntry, get_level},
    puzzle::GridPuzzle,
    render,
};

const RULES: &str = "Goal: Your goal is to reach and open the door.

Rules:
    1. You can move on the grid using the 'move' command followed by a direction (up/down/left/right)
    2. You can pick up objects when you are at their position using 'pick_up' followed by the object name
    3. You can drop objects from your inventory using 'drop' followed by the object name
    4. A pressed button opens the door
    5. Respond with one available action at a time";

/// Knobs for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Turns an agent gets before the session gives up.
    pub max_iterations: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_iterations: 30 }
    }
}

/// One command and the narrative it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub action: String,
    pub result: String,
}

/// Summary of a finished (or abandoned) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub level: u32,
    pub agent: String,
    pub total_steps: u32,
    pub is_solved: bool,
    pub num_iterations: usize,
    pub transcript: Vec<Turn>,
}

/// Drives one level to completion, one command at a time.
#[derive(Debug, Clone)]
pub struct Session {
    level: u32,
    puzzle: GridPuzzle,
    menu: Vec<MenuEntry>,
    config: SessionConfig,
    transcript: Vec<Turn>,
}

impl Session {
    pub fn new(level: Level, config: SessionConfig) -> Self {
        let number = level.number;
        let (puzzle, menu) = level.into_parts();
        Self {
            level: number,
            puzzle,
            menu,
            config,
            transcript: Vec::new(),
        }
    }

    /// Builds a fresh copy of level `number` and wraps it in a session.
    pub fn for_level(number: u32, config: SessionConfig) -> Result<Self, LevelError> {
        Ok(Self::new(get_level(number)?, config))
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn puzzle(&self) -> &GridPuzzle {
        &self.puzzle
    }

    pub fn menu(&self) -> &[MenuEntry] {
        &self.menu
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// Commands executed so far, meta-commands and the solving one included.
    pub fn iterations(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_finished(&self) -> bool {
        self.puzzle.is_solved() || self.iterations() >= self.config.max_iterations
    }

    pub fn available_actions(&self) -> Vec<String> {
        available_actions(&self.puzzle)
    }

    /// Opening text for an agent: rules, affordances, menu and current state.
    pub fn briefing(&self) -> String {
        format!(
            "{RULES}\n\nCurrently available actions:\n{}\n\n{}\n\nCurrent State:\n{}",
            self.available_actions().join("\n"),
            render::action_menu(&self.menu),
            render::state(&self.puzzle)
        )
    }

    /// Executes one command. `status` and `solved` are answered without
    /// touching the puzzle; everything else goes through the action layer.
    pub fn submit(&mut self, action_text: &str) -> &Turn {
        let result = match action_text.trim().to_lowercase().as_str() {
            "status" => self.puzzle.get_status(),
            "solved" if self.puzzle.is_solved() => "The puzzle is solved.".to_string(),
            "solved" => "The puzzle is not solved yet.".to_string(),
            _ => ActionHandler::new(&mut self.puzzle).execute(action_text),
        };
        debug!(level = self.level, action = action_text, %result, "turn");

        self.transcript.push(Turn {
            action: action_text.to_string(),
            result,
        });
        if self.puzzle.is_solved() {
            info!(
                level = self.level,
                steps = self.puzzle.steps(),
                iterations = self.iterations(),
                "puzzle_solved"
            );
        }
        &self.transcript[self.transcript.len() - 1]
    }

    /// Asks `agent` for its next command and executes it. Returns `None` once
    /// the session is finished.
    pub fn step(&mut self, agent: &mut dyn Agent) -> Option<&Turn> {
        if self.is_finished() {
            return None;
        }
        let state = render::state(&self.puzzle);
        let actions = self.available_actions();
        let view = AgentView {
            state: &state,
            available_actions: &actions,
            last_result: self.transcript.last().map(|turn| turn.result.as_str()),
        };
        let action = agent.next_action(&view);
        Some(self.submit(&action))
    }

    /// Plays until solved or out of turns.
    pub fn run(mut self, agent: &mut dyn Agent) -> SessionReport {
        while self.step(agent).is_some() {}
        let report = self.report(agent.name());
        info!(
            level = report.level,
            agent = %report.agent,
            solved = report.is_solved,
            steps = report.total_steps,
            iterations = report.num_iterations,
            "session_finished"
        );
        report
    }

    /// Snapshot of the run so far, attributed to `agent`.
    pub fn report(&self, agent: &str) -> SessionReport {
        SessionReport {
            level: self.level,
            agent: agent.to_string(),
            total_steps: self.puzzle.steps(),
            is_solved: self.puzzle.is_solved(),
            num_iterations: self.iterations(),
            transcript: self.transcript.clone(),
        }
    }
}
