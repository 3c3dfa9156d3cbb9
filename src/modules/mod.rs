pub mod camera;
pub mod coords;
pub mod engine;
pub mod error;
pub mod grid;
pub mod logging;
pub mod persistence;
pub mod policy;
pub mod recorder;
pub mod rules;
