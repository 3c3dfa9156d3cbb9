use std::collections::VecDeque;
use std::io::BufRead;

use clap::ValueEnum;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::modules::coords::{ALL_ACTIONS, Action};
use crate::modules::engine::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Play back the actions given on the command line
    Scripted,
    /// Read one action per line from stdin
    Input,
    /// Seeded random walk standing in for a trained policy
    Random,
}

/// Source of actions for the agent, polled once per tick.
///
/// Returning `Action::None` ends the current run.
pub trait AgentPolicy {
    fn kind(&self) -> &'static str;

    fn next_action(&mut self, frame: &Frame<'_>) -> Action;
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    queue: VecDeque<Action>,
}

impl ScriptedPolicy {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            queue: actions.into_iter().collect(),
        }
    }
}

impl AgentPolicy for ScriptedPolicy {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn next_action(&mut self, _frame: &Frame<'_>) -> Action {
        self.queue.pop_front().unwrap_or(Action::None)
    }
}

/// Line-oriented interactive input.
pub struct InputPolicy<R: BufRead> {
    reader: R,
    finished: bool,
}

impl<R: BufRead> InputPolicy<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            finished: false,
        }
    }
}

impl<R: BufRead> AgentPolicy for InputPolicy<R> {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn next_action(&mut self, _frame: &Frame<'_>) -> Action {
        let mut line = String::new();
        while !self.finished {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed.eq_ignore_ascii_case("quit") {
                        self.finished = true;
                        break;
                    }
                    match trimmed.parse::<Action>() {
                        Ok(Action::None) => {
                            self.finished = true;
                        }
                        Ok(action) => return action,
                        Err(err) => warn!("ignoring input: {}", err),
                    }
                }
                Err(err) => {
                    warn!("input closed: {}", err);
                    self.finished = true;
                }
            }
        }
        Action::None
    }
}

/// Uniform random choice over all non-terminating actions.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
    remaining: u64,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>, steps: u64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            remaining: steps,
        }
    }
}

impl AgentPolicy for RandomPolicy {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn next_action(&mut self, _frame: &Frame<'_>) -> Action {
        if self.remaining == 0 {
            return Action::None;
        }
        self.remaining -= 1;
        ALL_ACTIONS[self.rng.gen_range(0..ALL_ACTIONS.len())]
    }
}
