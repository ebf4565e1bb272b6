use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// What an agent gets to see before each turn.
#[derive(Debug, Clone, Copy)]
pub struct AgentView<'a> {
    /// Rendered puzzle, object list and player status.
    pub state: &'a str,
    /// Commands that make sense from the player's current cell.
    pub available_actions: &'a [String],
    /// Narrative produced by the previous action, if any.
    pub last_result: Option<&'a str>,
}

/// Trait defining the behavior of an agent.
/// Agents answer each view with one line of command text.
pub trait Agent {
    /// Short name used in reports.
    fn name(&self) -> &str;

    /// `&mut self` allows the agent to keep state between turns.
    fn next_action(&mut self, view: &AgentView<'_>) -> String;
}

/// Picks uniformly among the available actions.
#[derive(Debug)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    /// Same seed, same choices.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn next_action(&mut self, view: &AgentView<'_>) -> String {
        if view.available_actions.is_empty() {
            return String::new();
        }
        let index = self.rng.random_range(0..view.available_actions.len());
        view.available_actions[index].clone()
    }
}

/// Replays a fixed list of commands, then sends empty commands.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    commands: VecDeque<String>,
}

impl ScriptedAgent {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits `script` on `;` or newlines, dropping blank entries.
    pub fn from_script(script: &str) -> Self {
        Self::new(
            script
                .split([';', '\n'])
                .map(str::trim)
                .filter(|command| !command.is_empty()),
        )
    }

    pub fn remaining(&self) -> usize {
        self.commands.len()
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    fn next_action(&mut self, _view: &AgentView<'_>) -> String {
        self.commands.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(actions: &[String]) -> AgentView<'_> {
        AgentView {
            state: "",
            available_actions: actions,
            last_result: None,
        }
    }

    #[test]
    fn random_agent_only_picks_offered_actions() {
        let actions = vec!["move up".to_string(), "pick_up rock".to_string()];
        let mut agent = RandomAgent::new(7);
        for _ in 0..20 {
            let choice = agent.next_action(&view(&actions));
            assert!(actions.contains(&choice));
        }
    }

    #[test]
    fn random_agent_is_reproducible_per_seed() {
        let actions: Vec<String> = ["move up", "move down", "move left", "move right"]
            .map(String::from)
            .to_vec();
        let mut first = RandomAgent::new(42);
        let mut second = RandomAgent::new(42);
        for _ in 0..10 {
            assert_eq!(
                first.next_action(&view(&actions)),
                second.next_action(&view(&actions))
            );
        }
    }

    #[test]
    fn scripted_agent_replays_then_runs_dry() {
        let mut agent = ScriptedAgent::from_script("move up; pick_up rock;\n\ndrop rock");
        assert_eq!(agent.remaining(), 3);
        let actions = Vec::new();
        assert_eq!(agent.next_action(&view(&actions)), "move up");
        assert_eq!(agent.next_action(&view(&actions)), "pick_up rock");
        assert_eq!(agent.next_action(&view(&actions)), "drop rock");
        assert_eq!(agent.next_action(&view(&actions)), "");
    }
}
