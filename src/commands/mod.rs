use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use gridworld::{
    Action, BlockType, Coordinates, DEFAULT_BLOCK_TYPES, DEFAULT_DIMENSIONS, Dimensions, GridWorld,
    WorldConfig, default_world_path,
};

mod play;
mod world;

use play::{ReplayCommand, RunCommand, run_policy, run_replay};
use world::{print_world, run_new};

#[derive(Parser)]
#[command(
    name = "gridworld",
    version,
    about = "Voxel grid world with a single agent, recordings and replay",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty world file
    New {
        #[command(flatten)]
        world: WorldArgs,
        /// Overwrite an existing world file
        #[arg(long)]
        force: bool,
    },
    /// Print a world file
    Show {
        #[command(flatten)]
        world: WorldArgs,
        /// Print the world as JSON
        #[arg(long)]
        json: bool,
        /// Draw each y layer as a text grid
        #[arg(long)]
        layers: bool,
    },
    /// Drive the agent with a policy, optionally recording the actions
    Run(RunCommand),
    /// Rebuild the final state of a saved recording
    Replay(ReplayCommand),
}

/// Where the world lives and how big it is.
#[derive(Args, Clone, Debug)]
pub struct WorldArgs {
    /// World file path
    #[arg(long, default_value_os_t = default_world_path())]
    pub path: PathBuf,
    /// Grid size as w,h,d (checked against the file unless --fresh)
    #[arg(long, value_name = "w,h,d")]
    pub size: Option<DimsArg>,
    /// Number of block types (tags 1..=N)
    #[arg(long)]
    pub blocks: Option<BlockType>,
    /// Start from an empty grid instead of loading the world file
    #[arg(long)]
    pub fresh: bool,
}

impl WorldArgs {
    fn config(&self, fresh: bool) -> WorldConfig {
        WorldConfig {
            dims: self.size.map(|s| s.0).unwrap_or(DEFAULT_DIMENSIONS),
            n_block_types: self.blocks.unwrap_or(DEFAULT_BLOCK_TYPES),
            path: self.path.clone(),
            fresh,
        }
    }

    /// Fresh grid, a load checked against `--size`, or the file as-is.
    pub fn open(&self) -> Result<GridWorld, String> {
        let world = if self.fresh {
            GridWorld::new(self.config(true))
        } else if self.size.is_some() || self.blocks.is_some() {
            GridWorld::new(self.config(false))
        } else {
            GridWorld::open(self.path.clone())
        };
        world.map_err(|e| e.to_string())
    }
}

/// Three comma-separated integers, named `names[i]` in error messages.
fn parse_triple(s: &str, names: [&str; 3]) -> Result<[i32; 3], String> {
    let parts: Vec<_> = s.trim().split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected {}", names.join(",")));
    }
    let mut values = [0i32; 3];
    for (slot, (part, name)) in values.iter_mut().zip(parts.iter().zip(names)) {
        *slot = part
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("{} must be an integer", name))?;
    }
    Ok(values)
}

#[derive(Clone, Copy, Debug)]
pub struct DimsArg(pub Dimensions);

impl FromStr for DimsArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const NAMES: [&str; 3] = ["width", "height", "depth"];
        let [w, h, d] = parse_triple(s, NAMES)?;
        for (value, name) in [w, h, d].into_iter().zip(NAMES) {
            if value < 1 {
                return Err(format!("{} must be at least 1", name));
            }
        }
        Ok(DimsArg(Dimensions::new(w, h, d)))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PositionArg(pub Coordinates);

impl FromStr for PositionArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, z] = parse_triple(s, ["x", "y", "z"])?;
        Ok(PositionArg(Coordinates::new(x, y, z)))
    }
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::New { world, force } => run_new(world, force),
        Command::Show {
            world,
            json,
            layers,
        } => {
            let grid_world = world.open()?;
            print_world(&grid_world, json, layers)
        }
        Command::Run(cmd) => run_policy(cmd),
        Command::Replay(cmd) => run_replay(cmd),
    }
}

pub(crate) fn describe_actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "-".into();
    }
    actions
        .iter()
        .map(|a| a.label())
        .collect::<Vec<_>>()
        .join(" ")
}
