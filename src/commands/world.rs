use gridworld::{BlockType, Coordinates, EMPTY, GridWorld};
use serde::Serialize;

use super::WorldArgs;

#[derive(Serialize)]
struct BlockView {
    x: i32,
    y: i32,
    z: i32,
    block: BlockType,
}

#[derive(Serialize)]
struct WorldView {
    path: String,
    width: i32,
    height: i32,
    depth: i32,
    n_block_types: BlockType,
    agent: Coordinates,
    blocks: Vec<BlockView>,
}

pub(super) fn run_new(args: WorldArgs, force: bool) -> Result<(), String> {
    if args.path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite",
            args.path.display()
        ));
    }
    let world = GridWorld::new(args.config(true)).map_err(|e| e.to_string())?;
    world.save_target().map_err(|e| e.to_string())?;
    println!(
        "Created {} world with {} block types at {}",
        world.dims(),
        world.n_block_types(),
        world.path().display()
    );
    Ok(())
}

pub(super) fn print_world(world: &GridWorld, json: bool, layers: bool) -> Result<(), String> {
    if json {
        let dims = world.dims();
        let view = WorldView {
            path: world.path().display().to_string(),
            width: dims.width,
            height: dims.height,
            depth: dims.depth,
            n_block_types: world.n_block_types(),
            agent: world.agent_pos(),
            blocks: world
                .grid()
                .blocks()
                .map(|(c, block)| BlockView {
                    x: c.x,
                    y: c.y,
                    z: c.z,
                    block,
                })
                .collect(),
        };
        let text = serde_json::to_string_pretty(&view).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    println!(
        "World {} | {} | block_types={} | blocks={} | agent={}",
        world.path().display(),
        world.dims(),
        world.n_block_types(),
        world.grid().block_count(),
        world.agent_pos()
    );
    if layers {
        for line in render_layers(world) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// One text block per y layer, top layer first. Rows are z, columns are x;
/// `@` marks the agent and block tags print in base 36.
fn render_layers(world: &GridWorld) -> Vec<String> {
    let dims = world.dims();
    let agent = world.agent_pos();
    let mut lines = Vec::new();
    for y in (0..dims.height).rev() {
        lines.push(format!("y={}", y));
        for z in 0..dims.depth {
            let row: String = (0..dims.width)
                .map(|x| {
                    let c = Coordinates::new(x, y, z);
                    if c == agent {
                        return '@';
                    }
                    match world.grid().get(c) {
                        Ok(EMPTY) | Err(_) => '.',
                        Ok(tag) => std::char::from_digit(u32::from(tag), 36).unwrap_or('#'),
                    }
                })
                .collect();
            lines.push(format!("  {}", row));
        }
    }
    lines
}
