use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};

use crate::modules::camera::Camera;
use crate::modules::coords::{Action, Coordinates, Dimensions, MAX_CELLS};
use crate::modules::error::WorldError;
use crate::modules::grid::{BlockType, Grid};
use crate::modules::persistence::{self, WorldFile, default_world_path, sequence_path_for};
use crate::modules::policy::AgentPolicy;
use crate::modules::recorder::{Recorder, Sequence};
use crate::modules::rules::{self, Rejection};

pub const DEFAULT_BLOCK_TYPES: BlockType = 12;
pub const DEFAULT_DIMENSIONS: Dimensions = Dimensions::new(4, 4, 4);

/// Construction parameters for a [`GridWorld`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    pub dims: Dimensions,
    pub n_block_types: BlockType,
    pub path: PathBuf,
    /// Start from an empty grid instead of loading `path`.
    pub fresh: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            dims: DEFAULT_DIMENSIONS,
            n_block_types: DEFAULT_BLOCK_TYPES,
            path: default_world_path(),
            fresh: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Rejected(Rejection),
    /// `Action::None`: nothing to do this tick.
    Idle,
}

impl From<Result<(), Rejection>> for StepOutcome {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => StepOutcome::Applied,
            Err(rejection) => StepOutcome::Rejected(rejection),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub applied: u64,
    pub rejected: u64,
    /// The policy ended the run with `Action::None`.
    pub terminated: bool,
}

impl RunSummary {
    fn observe(&mut self, outcome: &StepOutcome) {
        self.ticks = self.ticks.saturating_add(1);
        match outcome {
            StepOutcome::Applied => self.applied = self.applied.saturating_add(1),
            StepOutcome::Rejected(_) => self.rejected = self.rejected.saturating_add(1),
            StepOutcome::Idle => {}
        }
    }
}

/// What a presenter needs to draw one frame. Recording state is not exposed.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub grid: &'a Grid,
    pub agent_pos: Coordinates,
    pub block_type: BlockType,
    pub camera: Camera,
}

/// A bounded block grid with a single agent moving through it.
pub struct GridWorld {
    dims: Dimensions,
    n_block_types: BlockType,
    path: PathBuf,
    grid: Grid,
    agent_pos: Coordinates,
    current_block_type: BlockType,
    camera: Camera,
    recorder: Recorder,
    policy: Option<Box<dyn AgentPolicy>>,
}

impl fmt::Debug for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridWorld")
            .field("dims", &self.dims)
            .field("n_block_types", &self.n_block_types)
            .field("path", &self.path)
            .field("agent_pos", &self.agent_pos)
            .field("current_block_type", &self.current_block_type)
            .field("camera", &self.camera)
            .field("blocks", &self.grid.block_count())
            .field("recording", &self.recorder.is_recording())
            .field("policy", &self.policy.as_ref().map(|p| p.kind()))
            .finish()
    }
}

impl GridWorld {
    /// Build a world from `config`. Unless `fresh` is set the grid is loaded
    /// from `config.path`, and any load failure is returned.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        if !config.dims.is_valid() {
            return Err(WorldError::InvalidConfig(format!(
                "grid dimensions must be positive and hold at most {} cells, got {}",
                MAX_CELLS, config.dims
            )));
        }
        if config.n_block_types == 0 {
            return Err(WorldError::InvalidConfig(
                "at least one block type is required".into(),
            ));
        }

        let mut world = Self {
            dims: config.dims,
            n_block_types: config.n_block_types,
            path: config.path,
            grid: Grid::new(config.dims),
            agent_pos: Coordinates::origin(),
            current_block_type: 1,
            camera: Camera::default(),
            recorder: Recorder::new(),
            policy: None,
        };
        if !config.fresh {
            world.load_from_file()?;
        }
        Ok(world)
    }

    /// Open an existing world file, taking dimensions and block types from it.
    pub fn open(path: PathBuf) -> Result<Self, WorldError> {
        let loaded = persistence::load_world(&path)?;
        let mut world = Self::new(WorldConfig {
            dims: loaded.grid.dims(),
            n_block_types: loaded.n_block_types,
            path,
            fresh: true,
        })?;
        world.grid = loaded.grid;
        if let Some(agent) = loaded.agent {
            world.agent_pos = agent;
        }
        Ok(world)
    }

    pub fn with_policy(mut self, policy: Box<dyn AgentPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn set_policy(&mut self, policy: Box<dyn AgentPolicy>) {
        self.policy = Some(policy);
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn n_block_types(&self) -> BlockType {
        self.n_block_types
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agent_pos(&self) -> Coordinates {
        self.agent_pos
    }

    /// Teleport the agent. Not recorded.
    pub fn set_agent_pos(&mut self, pos: Coordinates) -> Result<(), WorldError> {
        if !self.dims.contains(pos) {
            return Err(WorldError::OutOfBounds {
                coords: pos,
                dims: self.dims,
            });
        }
        self.agent_pos = pos;
        Ok(())
    }

    pub fn current_block_type(&self) -> BlockType {
        self.current_block_type
    }

    fn check_block_type(&self, block_type: BlockType) -> Result<(), WorldError> {
        if block_type == 0 || block_type > self.n_block_types {
            return Err(WorldError::InvalidBlockType {
                block_type,
                max: self.n_block_types,
            });
        }
        Ok(())
    }

    /// Select the block type used by later places. Captured when recording.
    pub fn set_block_type(&mut self, block_type: BlockType) -> Result<(), WorldError> {
        self.check_block_type(block_type)?;
        self.current_block_type = block_type;
        self.recorder.note_block_type(block_type);
        Ok(())
    }

    /// Select the next block type, wrapping back to 1.
    pub fn cycle_block_type(&mut self) -> BlockType {
        self.current_block_type = if self.current_block_type >= self.n_block_types {
            1
        } else {
            self.current_block_type + 1
        };
        self.recorder.note_block_type(self.current_block_type);
        self.current_block_type
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn can_place(&self, c: Coordinates) -> bool {
        rules::can_place(&self.grid, c)
    }

    pub fn can_remove(&self, c: Coordinates) -> bool {
        rules::can_remove(&self.grid, c)
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            grid: &self.grid,
            agent_pos: self.agent_pos,
            block_type: self.current_block_type,
            camera: self.camera,
        }
    }

    /// Apply one action at the agent's cell, recording it when active.
    pub fn apply(&mut self, action: Action) -> StepOutcome {
        self.recorder.push(action);
        let outcome = self.dispatch(action, self.agent_pos);
        log_outcome(action, &outcome);
        outcome
    }

    /// Place or remove at an explicit cell. Movement ignores `target`.
    ///
    /// Sequences only carry agent-relative actions, so an edit aimed away
    /// from the agent is applied but not recorded.
    pub fn apply_at(&mut self, action: Action, target: Coordinates) -> StepOutcome {
        if action.is_movement() || target == self.agent_pos {
            return self.apply(action);
        }
        if self.recorder.is_recording() {
            warn!("{} at {} is not captured by the recording", action, target);
        }
        let outcome = self.dispatch(action, target);
        log_outcome(action, &outcome);
        outcome
    }

    fn dispatch(&mut self, action: Action, target: Coordinates) -> StepOutcome {
        match action {
            Action::None => StepOutcome::Idle,
            Action::Place => rules::check_place(&self.grid, target)
                .and_then(|()| {
                    self.grid
                        .set(target, self.current_block_type)
                        .map_err(|_| Rejection::OutOfBounds { target })
                })
                .into(),
            Action::Remove => rules::check_remove(&self.grid, target)
                .and_then(|()| {
                    self.grid
                        .set(target, 0)
                        .map_err(|_| Rejection::OutOfBounds { target })
                })
                .into(),
            Action::Up
            | Action::Down
            | Action::Left
            | Action::Right
            | Action::Forward
            | Action::Backward => {
                let Some(delta) = action.delta() else {
                    return StepOutcome::Idle;
                };
                let candidate = self.agent_pos + delta;
                if self.dims.contains(candidate) {
                    self.agent_pos = candidate;
                    StepOutcome::Applied
                } else {
                    StepOutcome::Rejected(Rejection::OutOfBounds { target: candidate })
                }
            }
        }
    }

    /// Poll `policy` once and apply its action.
    pub fn step(&mut self, policy: &mut dyn AgentPolicy) -> (Action, StepOutcome) {
        let action = policy.next_action(&self.frame());
        let outcome = self.apply(action);
        (action, outcome)
    }

    /// Poll the owned policy once. `None` when no policy is installed.
    pub fn tick(&mut self) -> Option<(Action, StepOutcome)> {
        let mut policy = self.policy.take()?;
        let result = self.step(policy.as_mut());
        self.policy = Some(policy);
        Some(result)
    }

    /// Step until the policy yields `Action::None` or `max_ticks` actions ran.
    pub fn run(&mut self, policy: &mut dyn AgentPolicy, max_ticks: Option<u64>) -> RunSummary {
        let mut summary = RunSummary::default();
        debug!("running {} policy", policy.kind());
        loop {
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
            let (action, outcome) = self.step(policy);
            if action == Action::None {
                summary.terminated = true;
                break;
            }
            summary.observe(&outcome);
        }
        summary
    }

    /// [`GridWorld::run`] with the owned policy.
    pub fn run_injected(&mut self, max_ticks: Option<u64>) -> Option<RunSummary> {
        let mut policy = self.policy.take()?;
        let summary = self.run(policy.as_mut(), max_ticks);
        self.policy = Some(policy);
        Some(summary)
    }

    //----------------------------- recording ---------------------------------//

    /// Start (or restart) recording from the current state.
    pub fn record(&mut self) {
        self.recorder
            .start(self.agent_pos, self.current_block_type, &self.grid);
        info!("recording started at {}", self.agent_pos);
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn sequence(&self) -> &Sequence {
        self.recorder.sequence()
    }

    pub fn sequence_path(&self) -> PathBuf {
        sequence_path_for(&self.path)
    }

    /// Write the recording next to the world file. See [`GridWorld::save_sequence_to`].
    pub fn save_sequence(&self) -> Result<PathBuf, WorldError> {
        let path = self.sequence_path();
        self.save_sequence_to(&path)?;
        Ok(path)
    }

    /// Write the recording as a world file: the grid as it was when
    /// recording started plus the captured sequence. While idle an empty
    /// sequence from the current state is written.
    pub fn save_sequence_to(&self, path: &Path) -> Result<(), WorldError> {
        let (baseline, sequence) = match self.recorder.baseline() {
            Some(baseline) => (baseline, self.recorder.sequence().clone()),
            None => (
                &self.grid,
                Sequence {
                    starting_pos: self.agent_pos,
                    block_type: self.current_block_type,
                    actions: Vec::new(),
                    block_changes: Vec::new(),
                },
            ),
        };
        let count = sequence.actions.len();
        let file = WorldFile::from_grid(
            baseline,
            self.n_block_types,
            Some(sequence.starting_pos),
            Some(sequence),
        );
        persistence::write_world_file(path, &file)?;
        info!("saved {} recorded actions to {}", count, path.display());
        Ok(())
    }

    /// Reset to `baseline`, teleport to the sequence start and re-feed every
    /// action. Replayed actions are not recorded. State is untouched on error.
    pub fn replay_sequence(
        &mut self,
        baseline: Grid,
        sequence: &Sequence,
    ) -> Result<RunSummary, WorldError> {
        if baseline.dims() != self.dims {
            return Err(WorldError::DimensionMismatch {
                expected: self.dims,
                found: baseline.dims(),
            });
        }
        if !self.dims.contains(sequence.starting_pos) {
            return Err(WorldError::OutOfBounds {
                coords: sequence.starting_pos,
                dims: self.dims,
            });
        }
        self.check_block_type(sequence.block_type)?;
        for change in &sequence.block_changes {
            self.check_block_type(change.block_type)?;
        }

        self.grid = baseline;
        self.agent_pos = sequence.starting_pos;
        self.current_block_type = sequence.block_type;

        let mut changes = sequence.block_changes.iter().peekable();
        let mut summary = RunSummary::default();
        for (i, &action) in sequence.actions.iter().enumerate() {
            while let Some(change) = changes.next_if(|c| c.at <= i) {
                self.current_block_type = change.block_type;
            }
            if action == Action::None {
                summary.terminated = true;
                break;
            }
            let outcome = self.dispatch(action, self.agent_pos);
            summary.observe(&outcome);
        }
        if !summary.terminated {
            // Switches made after the last action still set the held type.
            for change in changes {
                self.current_block_type = change.block_type;
            }
        }
        debug!(
            "replayed {} actions ({} applied, {} rejected)",
            summary.ticks, summary.applied, summary.rejected
        );
        Ok(summary)
    }

    /// Rebuild the final state of a saved recording. The returned world
    /// saves to `world_path`.
    pub fn replay_file(sequence_path: &Path, world_path: PathBuf) -> Result<Self, WorldError> {
        let loaded = persistence::load_world(sequence_path)?;
        let sequence = loaded
            .sequence
            .ok_or_else(|| WorldError::format(sequence_path, "no recorded sequence"))?;
        let mut world = Self::new(WorldConfig {
            dims: loaded.grid.dims(),
            n_block_types: loaded.n_block_types,
            path: world_path,
            fresh: true,
        })?;
        world.replay_sequence(loaded.grid, &sequence)?;
        Ok(world)
    }

    //----------------------------- persistence -------------------------------//

    /// Write the grid and agent position to `path`, replacing any old file.
    pub fn save_target(&self) -> Result<(), WorldError> {
        let file = WorldFile::from_grid(&self.grid, self.n_block_types, Some(self.agent_pos), None);
        persistence::write_world_file(&self.path, &file)?;
        info!(
            "saved {} world with {} blocks to {}",
            self.dims,
            self.grid.block_count(),
            self.path.display()
        );
        Ok(())
    }

    /// Replace the grid with the contents of `path`. The file is fully
    /// decoded and checked before anything is swapped in.
    pub fn load_from_file(&mut self) -> Result<(), WorldError> {
        let loaded = persistence::load_world(&self.path)?;
        if loaded.grid.dims() != self.dims {
            return Err(WorldError::DimensionMismatch {
                expected: self.dims,
                found: loaded.grid.dims(),
            });
        }
        if let Some(max) = loaded.grid.cells().iter().copied().max() {
            if max > self.n_block_types {
                return Err(WorldError::format(
                    &self.path,
                    format!(
                        "block type {} exceeds the configured {} types",
                        max, self.n_block_types
                    ),
                ));
            }
        }

        self.grid = loaded.grid;
        if let Some(agent) = loaded.agent {
            self.agent_pos = agent;
        }
        info!(
            "loaded {} world with {} blocks from {}",
            self.dims,
            self.grid.block_count(),
            self.path.display()
        );
        Ok(())
    }
}

fn log_outcome(action: Action, outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Applied => trace!("{} applied", action),
        StepOutcome::Rejected(rejection) => debug!("{} rejected: {}", action, rejection),
        StepOutcome::Idle => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid::EMPTY;
    use crate::modules::policy::{RandomPolicy, ScriptedPolicy};
    use tempfile::TempDir;

    fn world(w: i32, h: i32, d: i32) -> GridWorld {
        GridWorld::new(WorldConfig {
            dims: Dimensions::new(w, h, d),
            n_block_types: 4,
            path: PathBuf::from("unused.json"),
            fresh: true,
        })
        .unwrap()
    }

    fn world_at(dir: &TempDir, w: i32, h: i32, d: i32, fresh: bool) -> Result<GridWorld, WorldError> {
        GridWorld::new(WorldConfig {
            dims: Dimensions::new(w, h, d),
            n_block_types: 4,
            path: dir.path().join("world.json"),
            fresh,
        })
    }

    #[test]
    fn place_twice_then_remove() {
        let mut w = world(4, 4, 4);
        w.set_block_type(2).unwrap();
        let origin = Coordinates::origin();

        assert_eq!(w.apply(Action::Place), StepOutcome::Applied);
        assert_eq!(w.grid().get(origin).unwrap(), 2);

        w.set_block_type(3).unwrap();
        assert_eq!(
            w.apply(Action::Place),
            StepOutcome::Rejected(Rejection::Occupied { target: origin })
        );
        assert_eq!(w.grid().get(origin).unwrap(), 2);

        assert_eq!(w.apply(Action::Remove), StepOutcome::Applied);
        assert_eq!(w.grid().get(origin).unwrap(), EMPTY);
    }

    #[test]
    fn second_remove_is_a_noop() {
        let mut w = world(3, 3, 3);
        w.apply(Action::Place);
        w.apply(Action::Remove);
        let after_first = w.grid().clone();
        assert_eq!(
            w.apply(Action::Remove),
            StepOutcome::Rejected(Rejection::Empty {
                target: Coordinates::origin()
            })
        );
        assert_eq!(w.grid(), &after_first);
    }

    #[test]
    fn moving_off_the_edge_keeps_agent_in_place() {
        let mut w = world(2, 2, 2);
        w.set_agent_pos(Coordinates::new(1, 1, 1)).unwrap();
        assert_eq!(
            w.apply(Action::Right),
            StepOutcome::Rejected(Rejection::OutOfBounds {
                target: Coordinates::new(2, 1, 1)
            })
        );
        assert_eq!(w.agent_pos(), Coordinates::new(1, 1, 1));
    }

    #[test]
    fn movement_never_leaves_the_grid() {
        let mut w = world(3, 2, 4);
        let mut policy = RandomPolicy::new(Some(42), 500);
        loop {
            let (action, _) = w.step(&mut policy);
            if action == Action::None {
                break;
            }
            assert!(w.dims().contains(w.agent_pos()), "{:?}", w.agent_pos());
        }
    }

    #[test]
    fn each_direction_moves_one_cell() {
        let mut w = world(3, 3, 3);
        w.set_agent_pos(Coordinates::new(1, 1, 1)).unwrap();
        let expected = [
            (Action::Up, Coordinates::new(1, 2, 1)),
            (Action::Down, Coordinates::new(1, 1, 1)),
            (Action::Left, Coordinates::new(0, 1, 1)),
            (Action::Right, Coordinates::new(1, 1, 1)),
            (Action::Forward, Coordinates::new(1, 1, 2)),
            (Action::Backward, Coordinates::new(1, 1, 1)),
        ];
        for (action, pos) in expected {
            assert_eq!(w.apply(action), StepOutcome::Applied);
            assert_eq!(w.agent_pos(), pos, "{}", action);
        }
    }

    #[test]
    fn none_is_idle() {
        let mut w = world(2, 2, 2);
        w.record();
        assert_eq!(w.apply(Action::None), StepOutcome::Idle);
        assert!(w.sequence().actions.is_empty());
    }

    #[test]
    fn targeted_edits_respect_rules() {
        let mut w = world(2, 2, 2);
        let target = Coordinates::new(1, 0, 1);
        assert_eq!(w.apply_at(Action::Place, target), StepOutcome::Applied);
        assert_eq!(w.grid().get(target).unwrap(), 1);
        assert!(matches!(
            w.apply_at(Action::Place, Coordinates::new(5, 0, 0)),
            StepOutcome::Rejected(Rejection::OutOfBounds { .. })
        ));
        assert_eq!(w.apply_at(Action::Remove, target), StepOutcome::Applied);
        assert!(w.can_place(target));
        assert_eq!(w.agent_pos(), Coordinates::origin());
    }

    #[test]
    fn block_type_selection() {
        let mut w = world(2, 2, 2);
        assert_eq!(w.current_block_type(), 1);
        assert!(matches!(
            w.set_block_type(0),
            Err(WorldError::InvalidBlockType { .. })
        ));
        assert!(w.set_block_type(5).is_err());
        w.set_block_type(4).unwrap();
        assert_eq!(w.cycle_block_type(), 1);
        assert_eq!(w.cycle_block_type(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad_dims = GridWorld::new(WorldConfig {
            dims: Dimensions::new(0, 2, 2),
            ..WorldConfig::default()
        });
        assert!(matches!(bad_dims, Err(WorldError::InvalidConfig(_))));
        let no_blocks = GridWorld::new(WorldConfig {
            n_block_types: 0,
            ..WorldConfig::default()
        });
        assert!(matches!(no_blocks, Err(WorldError::InvalidConfig(_))));
        let huge = GridWorld::new(WorldConfig {
            dims: Dimensions::new(i32::MAX, i32::MAX, i32::MAX),
            ..WorldConfig::default()
        });
        assert!(matches!(huge, Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut w = world_at(&dir, 3, 3, 3, true).unwrap();
        w.apply(Action::Place);
        w.apply(Action::Up);
        w.set_block_type(3).unwrap();
        w.apply(Action::Place);
        w.apply(Action::Forward);
        w.save_target().unwrap();

        let loaded = world_at(&dir, 3, 3, 3, false).unwrap();
        assert_eq!(loaded.grid(), w.grid());
        assert_eq!(loaded.agent_pos(), w.agent_pos());
    }

    #[test]
    fn open_adopts_file_dimensions() {
        let dir = TempDir::new().unwrap();
        let mut w = world_at(&dir, 2, 3, 4, true).unwrap();
        w.apply(Action::Forward);
        w.apply(Action::Place);
        w.save_target().unwrap();

        let opened = GridWorld::open(dir.path().join("world.json")).unwrap();
        assert_eq!(opened.dims(), Dimensions::new(2, 3, 4));
        assert_eq!(opened.n_block_types(), 4);
        assert_eq!(opened.agent_pos(), Coordinates::new(0, 0, 1));
        assert_eq!(opened.grid(), w.grid());
    }

    #[test]
    fn loading_a_missing_world_fails() {
        let dir = TempDir::new().unwrap();
        let err = world_at(&dir, 2, 2, 2, false).unwrap_err();
        assert!(matches!(err, WorldError::FileNotFound { .. }));
    }

    #[test]
    fn failed_load_leaves_grid_untouched() {
        let dir = TempDir::new().unwrap();
        let mut small = world_at(&dir, 2, 2, 2, true).unwrap();
        small.apply(Action::Place);
        small.save_target().unwrap();

        let mut big = world_at(&dir, 3, 3, 3, true).unwrap();
        big.set_agent_pos(Coordinates::new(2, 2, 2)).unwrap();
        big.apply(Action::Place);
        let before = big.grid().clone();

        let err = big.load_from_file().unwrap_err();
        assert!(matches!(
            err,
            WorldError::DimensionMismatch { expected, found }
                if expected == Dimensions::new(3, 3, 3) && found == Dimensions::new(2, 2, 2)
        ));
        assert_eq!(big.grid(), &before);
        assert_eq!(big.agent_pos(), Coordinates::new(2, 2, 2));
    }

    #[test]
    fn load_rejects_block_types_beyond_config() {
        let dir = TempDir::new().unwrap();
        let mut w = world_at(&dir, 2, 2, 2, true).unwrap();
        w.set_block_type(4).unwrap();
        w.apply(Action::Place);
        w.save_target().unwrap();

        let mut narrow = GridWorld::new(WorldConfig {
            dims: Dimensions::new(2, 2, 2),
            n_block_types: 2,
            path: dir.path().join("world.json"),
            fresh: true,
        })
        .unwrap();
        assert!(matches!(
            narrow.load_from_file(),
            Err(WorldError::Format { .. })
        ));
        assert_eq!(narrow.grid().block_count(), 0);
    }

    #[test]
    fn record_save_and_replay_reproduces_final_state() {
        let dir = TempDir::new().unwrap();
        let mut w = world_at(&dir, 4, 4, 4, true).unwrap();
        w.set_agent_pos(Coordinates::new(1, 0, 1)).unwrap();
        w.apply_at(Action::Place, Coordinates::new(2, 0, 2));
        w.record();
        for action in [Action::Forward, Action::Place, Action::Right, Action::Remove] {
            w.apply(action);
        }
        assert_eq!(w.sequence().starting_pos, Coordinates::new(1, 0, 1));
        assert_eq!(w.sequence().actions.len(), 4);

        let seq_path = w.save_sequence().unwrap();
        assert!(w.is_recording());

        let replayed = GridWorld::replay_file(&seq_path, dir.path().join("out.json")).unwrap();
        assert_eq!(replayed.grid(), w.grid());
        assert_eq!(replayed.agent_pos(), w.agent_pos());
        assert_eq!(replayed.grid().get(Coordinates::new(1, 0, 2)).unwrap(), 1);
        assert_eq!(replayed.grid().get(Coordinates::new(2, 0, 2)).unwrap(), EMPTY);
    }

    #[test]
    fn block_type_switches_while_recording_replay_faithfully() {
        let dir = TempDir::new().unwrap();
        let mut w = world_at(&dir, 3, 3, 3, true).unwrap();
        w.record();
        w.apply(Action::Place);
        w.set_block_type(3).unwrap();
        w.apply(Action::Forward);
        w.apply(Action::Place);
        w.cycle_block_type();
        let seq_path = w.save_sequence().unwrap();

        let replayed = GridWorld::replay_file(&seq_path, dir.path().join("out.json")).unwrap();
        assert_eq!(replayed.grid(), w.grid());
        assert_eq!(replayed.grid().get(Coordinates::origin()).unwrap(), 1);
        assert_eq!(replayed.grid().get(Coordinates::new(0, 0, 1)).unwrap(), 3);
        assert_eq!(replayed.current_block_type(), 4);
    }

    #[test]
    fn replay_rejects_unknown_block_switches_up_front() {
        let mut w = world(2, 2, 2);
        let sequence = Sequence {
            actions: vec![Action::Place, Action::Forward, Action::Place],
            block_changes: vec![crate::modules::recorder::BlockChange {
                at: 2,
                block_type: 9,
            }],
            ..Sequence::default()
        };
        let err = w
            .replay_sequence(Grid::new(Dimensions::new(2, 2, 2)), &sequence)
            .unwrap_err();
        assert!(matches!(err, WorldError::InvalidBlockType { block_type: 9, .. }));
        assert_eq!(w.grid().block_count(), 0);
    }

    #[test]
    fn record_restarts_capture() {
        let mut w = world(3, 3, 3);
        w.record();
        w.apply(Action::Up);
        w.apply(Action::Place);
        w.record();
        assert_eq!(w.sequence().starting_pos, Coordinates::new(0, 1, 0));
        assert!(w.sequence().actions.is_empty());
    }

    #[test]
    fn rejected_actions_are_recorded_and_replay_as_noops() {
        let mut w = world(2, 2, 2);
        w.record();
        w.apply(Action::Left);
        w.apply(Action::Place);
        w.apply(Action::Place);
        assert_eq!(
            w.sequence().actions,
            vec![Action::Left, Action::Place, Action::Place]
        );

        let sequence = w.sequence().clone();
        let mut copy = world(2, 2, 2);
        let summary = copy
            .replay_sequence(Grid::new(Dimensions::new(2, 2, 2)), &sequence)
            .unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(copy.grid(), w.grid());
    }

    #[test]
    fn replay_rejects_mismatched_baseline() {
        let mut w = world(2, 2, 2);
        w.apply(Action::Place);
        let before = w.grid().clone();
        let err = w
            .replay_sequence(Grid::new(Dimensions::new(3, 3, 3)), &Sequence::default())
            .unwrap_err();
        assert!(matches!(err, WorldError::DimensionMismatch { .. }));
        assert_eq!(w.grid(), &before);
    }

    #[test]
    fn replay_requires_a_sequence() {
        let dir = TempDir::new().unwrap();
        let w = world_at(&dir, 2, 2, 2, true).unwrap();
        w.save_target().unwrap();
        let err = GridWorld::replay_file(w.path(), dir.path().join("out.json")).unwrap_err();
        assert!(matches!(err, WorldError::Format { .. }));
    }

    #[test]
    fn run_stops_on_none_or_tick_limit() {
        let mut w = world(4, 4, 4);
        let mut script = ScriptedPolicy::new([Action::Place, Action::Up, Action::Place, Action::Place]);
        let summary = w.run(&mut script, None);
        assert_eq!(
            summary,
            RunSummary {
                ticks: 4,
                applied: 3,
                rejected: 1,
                terminated: true,
            }
        );
        assert_eq!(w.grid().block_count(), 2);

        let mut random = RandomPolicy::new(Some(1), 1_000);
        let limited = w.run(&mut random, Some(10));
        assert_eq!(limited.ticks, 10);
        assert!(!limited.terminated);
    }

    #[test]
    fn injected_policy_drives_ticks() {
        let mut w = world(2, 2, 2).with_policy(Box::new(ScriptedPolicy::new([
            Action::Forward,
            Action::Place,
        ])));
        assert_eq!(w.tick(), Some((Action::Forward, StepOutcome::Applied)));
        assert_eq!(w.tick(), Some((Action::Place, StepOutcome::Applied)));
        assert_eq!(w.tick(), Some((Action::None, StepOutcome::Idle)));
        assert_eq!(w.grid().get(Coordinates::new(0, 0, 1)).unwrap(), 1);

        let mut empty = world(2, 2, 2);
        assert_eq!(empty.tick(), None);
        assert!(empty.run_injected(None).is_none());
    }

    #[test]
    fn frame_exposes_presenter_view() {
        let mut w = world(2, 2, 2);
        w.apply(Action::Place);
        w.apply(Action::Up);
        let frame = w.frame();
        assert_eq!(frame.agent_pos, Coordinates::new(0, 1, 0));
        assert_eq!(frame.camera, Camera::default());
        assert_eq!(
            frame.grid.blocks().collect::<Vec<_>>(),
            vec![(Coordinates::origin(), 1)]
        );
    }

    #[test]
    fn camera_pose_is_carried_into_frames() {
        let mut w = world(2, 2, 2);
        let camera = Camera {
            position: [1.0, 2.0, 3.0],
            fovy: 60.0,
            ..Camera::default()
        };
        w.set_camera(camera);
        assert_eq!(w.camera(), camera);
        assert_eq!(w.frame().camera, camera);
    }
}
