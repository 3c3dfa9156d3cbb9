//! World file encoding.
//!
//! A world file is a pretty-printed JSON document holding the grid
//! dimensions, every cell tag in scan order (x-major, then y, then z), a
//! SHA-256 checksum over the cell bytes and, for saved recordings, the
//! recorded sequence. Loading validates the whole document before anything
//! is handed back, so callers never observe a partially decoded grid.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::modules::coords::{Coordinates, Dimensions};
use crate::modules::error::WorldError;
use crate::modules::grid::{BlockType, Grid};
use crate::modules::recorder::Sequence;

pub const WORLD_FILE_VERSION: u32 = 1;

fn world_dir() -> PathBuf {
    PathBuf::from(".gridworld")
}

pub fn default_world_path() -> PathBuf {
    world_dir().join("world.json")
}

/// `world.json` -> `world.sequence.json`, next to the world file.
pub fn sequence_path_for(world_path: &Path) -> PathBuf {
    world_path.with_extension("sequence.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFile {
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<String>,
    pub dims: Dimensions,
    pub n_block_types: BlockType,
    #[serde(default)]
    pub agent: Option<Coordinates>,
    pub cells: Vec<BlockType>,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Sequence>,
}

/// A fully validated world file.
#[derive(Debug, Clone)]
pub struct LoadedWorld {
    pub grid: Grid,
    pub n_block_types: BlockType,
    pub agent: Option<Coordinates>,
    pub sequence: Option<Sequence>,
}

pub fn checksum(cells: &[BlockType]) -> String {
    hex::encode(Sha256::digest(cells))
}

impl WorldFile {
    pub fn from_grid(
        grid: &Grid,
        n_block_types: BlockType,
        agent: Option<Coordinates>,
        sequence: Option<Sequence>,
    ) -> Self {
        let cells = grid.cells().to_vec();
        Self {
            version: WORLD_FILE_VERSION,
            saved_at: Some(Utc::now().to_rfc3339()),
            dims: grid.dims(),
            n_block_types,
            agent,
            checksum: checksum(&cells),
            cells,
            sequence,
        }
    }

    /// Check every invariant and build the grid. `path` is only used for
    /// error messages.
    pub fn validate(self, path: &Path) -> Result<LoadedWorld, WorldError> {
        if self.version != WORLD_FILE_VERSION {
            return Err(WorldError::format(
                path,
                format!("unsupported version {}", self.version),
            ));
        }
        if !self.dims.is_positive() {
            return Err(WorldError::format(
                path,
                format!("invalid dimensions {}", self.dims),
            ));
        }
        let Some(volume) = self.dims.checked_volume() else {
            return Err(WorldError::format(
                path,
                format!("grid too large: {}", self.dims),
            ));
        };
        if self.cells.len() != volume {
            return Err(WorldError::format(
                path,
                format!(
                    "expected {} cells for {}, found {}",
                    volume,
                    self.dims,
                    self.cells.len()
                ),
            ));
        }
        if checksum(&self.cells) != self.checksum.to_lowercase() {
            return Err(WorldError::format(path, "cell checksum mismatch"));
        }
        if let Some((idx, tag)) = self
            .cells
            .iter()
            .enumerate()
            .find(|(_, t)| **t > self.n_block_types)
        {
            return Err(WorldError::format(
                path,
                format!(
                    "cell {} has block type {} but only {} types exist",
                    idx, tag, self.n_block_types
                ),
            ));
        }
        if let Some(agent) = self.agent {
            if !self.dims.contains(agent) {
                return Err(WorldError::format(
                    path,
                    format!("agent position {} is outside the grid", agent),
                ));
            }
        }
        if let Some(seq) = &self.sequence {
            if !self.dims.contains(seq.starting_pos) {
                return Err(WorldError::format(
                    path,
                    format!("sequence start {} is outside the grid", seq.starting_pos),
                ));
            }
        }

        let grid = Grid::from_cells(self.dims, self.cells)
            .map_err(|e| WorldError::format(path, e.to_string()))?;
        Ok(LoadedWorld {
            grid,
            n_block_types: self.n_block_types,
            agent: self.agent,
            sequence: self.sequence,
        })
    }
}

pub fn write_world_file(path: &Path, file: &WorldFile) -> Result<(), WorldError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_vec_pretty(file).map_err(io::Error::from)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_world_file(path: &Path) -> Result<WorldFile, WorldError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(WorldError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() {
        return Err(WorldError::format(path, "file is empty"));
    }
    serde_json::from_slice(&bytes).map_err(|e| WorldError::format(path, e.to_string()))
}

pub fn load_world(path: &Path) -> Result<LoadedWorld, WorldError> {
    read_world_file(path)?.validate(path)
}
