use std::io;
use std::path::PathBuf;

use clap::Args;
use gridworld::{
    Action, AgentPolicy, BlockType, GridWorld, InputPolicy, PolicyKind, RandomPolicy, RunSummary,
    ScriptedPolicy, default_world_path, sequence_path_for,
};

use super::{PositionArg, WorldArgs, describe_actions, world::print_world};

#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    pub world: WorldArgs,
    /// Action source: scripted (--action list), input (stdin lines) or random
    #[arg(long, default_value_t = PolicyKind::Scripted, value_enum)]
    pub policy: PolicyKind,
    /// Action (repeatable): up|down|left|right|forward|backward|place|remove
    #[arg(short = 'a', long = "action", value_name = "ACTION")]
    pub actions: Vec<Action>,
    /// RNG seed for the random policy
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of actions the random policy takes
    #[arg(long, default_value_t = 100)]
    pub steps: u64,
    /// Stop after this many ticks even if the policy has more to do
    #[arg(short = 't', long)]
    pub ticks: Option<u64>,
    /// Block type used by place actions
    #[arg(long)]
    pub block_type: Option<BlockType>,
    /// Teleport the agent here before running, as x,y,z
    #[arg(short = 'p', long)]
    pub start: Option<PositionArg>,
    /// Record the run and save the sequence afterwards
    #[arg(long)]
    pub record: bool,
    /// Where to write the recording (default: next to the world file)
    #[arg(long)]
    pub sequence_out: Option<PathBuf>,
    /// Do not write the world file after the run
    #[arg(long)]
    pub no_save: bool,
    /// Draw the final state layer by layer
    #[arg(long)]
    pub layers: bool,
}

#[derive(Args, Debug)]
pub struct ReplayCommand {
    /// Recording to replay (default: the sequence file next to the default world)
    #[arg(long)]
    pub sequence: Option<PathBuf>,
    /// Write the replayed world to this path
    #[arg(long)]
    pub save_to: Option<PathBuf>,
    /// Draw the final state layer by layer
    #[arg(long)]
    pub layers: bool,
}

fn build_policy(cmd: &RunCommand) -> Result<Box<dyn AgentPolicy>, String> {
    match cmd.policy {
        PolicyKind::Scripted => {
            if cmd.actions.is_empty() {
                return Err("scripted policy needs at least one --action".into());
            }
            Ok(Box::new(ScriptedPolicy::new(cmd.actions.iter().copied())))
        }
        PolicyKind::Input => Ok(Box::new(InputPolicy::new(io::stdin().lock()))),
        PolicyKind::Random => Ok(Box::new(RandomPolicy::new(cmd.seed, cmd.steps))),
    }
}

pub(super) fn run_policy(cmd: RunCommand) -> Result<(), String> {
    let mut world = cmd.world.open()?;
    if let Some(block_type) = cmd.block_type {
        world.set_block_type(block_type).map_err(|e| e.to_string())?;
    }
    if let Some(start) = cmd.start {
        world.set_agent_pos(start.0).map_err(|e| e.to_string())?;
    }

    let policy = build_policy(&cmd)?;
    let kind = policy.kind();
    if cmd.policy == PolicyKind::Input {
        eprintln!("Reading actions from stdin (one per line, `quit` or EOF to stop)");
    }
    world.set_policy(policy);
    if cmd.record {
        world.record();
    }

    let summary = world.run_injected(cmd.ticks).unwrap_or_default();
    print_summary(kind, &summary);

    if cmd.record {
        let path = match &cmd.sequence_out {
            Some(path) => {
                world.save_sequence_to(path).map_err(|e| e.to_string())?;
                path.clone()
            }
            None => world.save_sequence().map_err(|e| e.to_string())?,
        };
        println!(
            "Recorded {} actions from {}: {}",
            world.sequence().actions.len(),
            world.sequence().starting_pos,
            describe_actions(&world.sequence().actions)
        );
        println!("Sequence saved to {}", path.display());
    }

    if !cmd.no_save {
        world.save_target().map_err(|e| e.to_string())?;
        println!("World saved to {}", world.path().display());
    }

    print_world(&world, false, cmd.layers)
}

pub(super) fn run_replay(cmd: ReplayCommand) -> Result<(), String> {
    let sequence_path = cmd
        .sequence
        .unwrap_or_else(|| sequence_path_for(&default_world_path()));
    let target = cmd.save_to.clone().unwrap_or_else(default_world_path);
    let world = GridWorld::replay_file(&sequence_path, target).map_err(|e| e.to_string())?;
    println!("Replayed {}", sequence_path.display());

    if cmd.save_to.is_some() {
        world.save_target().map_err(|e| e.to_string())?;
        println!("World saved to {}", world.path().display());
    }

    print_world(&world, false, cmd.layers)
}

fn print_summary(kind: &str, summary: &RunSummary) {
    println!(
        "Ran {} policy: {} ticks | applied={} | rejected={}{}",
        kind,
        summary.ticks,
        summary.applied,
        summary.rejected,
        if summary.terminated {
            ""
        } else {
            " | stopped at tick limit"
        }
    );
}
