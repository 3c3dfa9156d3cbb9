pub mod modules;

pub use modules::camera::Camera;
pub use modules::coords::{ALL_ACTIONS, Action, Coordinates, Dimensions, MAX_CELLS};
pub use modules::engine::{
    DEFAULT_BLOCK_TYPES, DEFAULT_DIMENSIONS, Frame, GridWorld, RunSummary, StepOutcome,
    WorldConfig,
};
pub use modules::error::WorldError;
pub use modules::grid::{BlockType, EMPTY, Grid};
pub use modules::logging;
pub use modules::persistence::{
    self, LoadedWorld, WORLD_FILE_VERSION, WorldFile, default_world_path, load_world,
    read_world_file, sequence_path_for, write_world_file,
};
pub use modules::policy::{AgentPolicy, InputPolicy, PolicyKind, RandomPolicy, ScriptedPolicy};
pub use modules::recorder::{BlockChange, Recorder, RecorderState, Sequence};
pub use modules::rules::{self, Rejection, can_place, can_remove};
