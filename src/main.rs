mod commands;

fn main() {
    gridworld::logging::init();
    commands::run();
}
