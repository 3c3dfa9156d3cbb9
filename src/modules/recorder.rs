use serde::{Deserialize, Serialize};

use crate::modules::coords::{Action, Coordinates};
use crate::modules::grid::{BlockType, Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    Idle,
    Recording,
}

fn default_block_type() -> BlockType {
    1
}

/// The held block type switched to `block_type` before `actions[at]` ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChange {
    pub at: usize,
    pub block_type: BlockType,
}

/// A replayable trajectory: where the agent started, which block it was
/// holding and what it was told to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub starting_pos: Coordinates,
    #[serde(default = "default_block_type")]
    pub block_type: BlockType,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_changes: Vec<BlockChange>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            starting_pos: Coordinates::origin(),
            block_type: default_block_type(),
            actions: Vec::new(),
            block_changes: Vec::new(),
        }
    }
}

/// Captures every dispatched action between `start` calls.
///
/// There is no stop transition: recording lasts until the next `start`,
/// which discards the previous capture.
#[derive(Debug, Clone)]
pub struct Recorder {
    state: RecorderState,
    sequence: Sequence,
    baseline: Option<Grid>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            state: RecorderState::Idle,
            sequence: Sequence::default(),
            baseline: None,
        }
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, agent_pos: Coordinates, block_type: BlockType, grid: &Grid) {
        self.state = RecorderState::Recording;
        self.sequence.starting_pos = agent_pos;
        self.sequence.block_type = block_type;
        self.sequence.actions.clear();
        self.sequence.block_changes.clear();
        self.baseline = Some(grid.clone());
    }

    /// Append while recording. `None` is a poll terminator and is skipped.
    pub fn push(&mut self, action: Action) -> bool {
        if self.state != RecorderState::Recording || action == Action::None {
            return false;
        }
        self.sequence.actions.push(action);
        true
    }

    /// Note a block type switch ahead of the next recorded action. Several
    /// switches between the same two actions collapse into the last one.
    pub fn note_block_type(&mut self, block_type: BlockType) -> bool {
        if self.state != RecorderState::Recording {
            return false;
        }
        let at = self.sequence.actions.len();
        match self.sequence.block_changes.last_mut() {
            Some(last) if last.at == at => last.block_type = block_type,
            _ => self
                .sequence
                .block_changes
                .push(BlockChange { at, block_type }),
        }
        true
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Grid as it was when recording started.
    pub fn baseline(&self) -> Option<&Grid> {
        self.baseline.as_ref()
    }
}
