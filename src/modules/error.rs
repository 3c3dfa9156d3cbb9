use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::modules::coords::{Coordinates, Dimensions};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("coordinates {coords} are outside the {dims} grid")]
    OutOfBounds {
        coords: Coordinates,
        dims: Dimensions,
    },

    #[error("world file {} not found", path.display())]
    FileNotFound { path: PathBuf },

    #[error("malformed world file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("world file is {found} but the grid is {expected}")]
    DimensionMismatch {
        expected: Dimensions,
        found: Dimensions,
    },

    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    #[error("block type {block_type} is not in 1..={max}")]
    InvalidBlockType { block_type: u8, max: u8 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WorldError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        WorldError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
