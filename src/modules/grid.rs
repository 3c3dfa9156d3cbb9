// Dense 3D block grid.
//
// Cells are stored flat in scan order (x-major, then y, then z), the same
// order the world file uses, so persistence is a straight copy of `cells`.
// Dimensions never change after construction.

use crate::modules::coords::{Coordinates, Dimensions};
use crate::modules::error::WorldError;

pub type BlockType = u8;

/// Tag of an empty cell.
pub const EMPTY: BlockType = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    dims: Dimensions,
    cells: Vec<BlockType>,
}

impl Grid {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            cells: vec![EMPTY; dims.volume()],
        }
    }

    /// Build a grid from cells already in scan order.
    pub fn from_cells(dims: Dimensions, cells: Vec<BlockType>) -> Result<Self, WorldError> {
        let Some(volume) = dims.checked_volume() else {
            return Err(WorldError::InvalidConfig(format!(
                "grid dimensions {} are not positive or too large",
                dims
            )));
        };
        if cells.len() != volume {
            return Err(WorldError::InvalidConfig(format!(
                "expected {} cells for a {} grid, got {}",
                volume,
                dims,
                cells.len()
            )));
        }
        Ok(Self { dims, cells })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn contains(&self, c: Coordinates) -> bool {
        self.dims.contains(c)
    }

    fn index(&self, c: Coordinates) -> Result<usize, WorldError> {
        self.dims.index_of(c).ok_or(WorldError::OutOfBounds {
            coords: c,
            dims: self.dims,
        })
    }

    pub fn get(&self, c: Coordinates) -> Result<BlockType, WorldError> {
        let idx = self.index(c)?;
        Ok(self.cells[idx])
    }

    pub fn set(&mut self, c: Coordinates, block_type: BlockType) -> Result<(), WorldError> {
        let idx = self.index(c)?;
        self.cells[idx] = block_type;
        Ok(())
    }

    pub fn cells(&self) -> &[BlockType] {
        &self.cells
    }

    /// Non-empty cells with their block type, in scan order.
    pub fn blocks(&self) -> impl Iterator<Item = (Coordinates, BlockType)> + '_ {
        let dims = self.dims;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != EMPTY)
            .filter_map(move |(idx, t)| dims.coordinates_of(idx).map(|c| (c, *t)))
    }

    pub fn block_count(&self) -> usize {
        self.cells.iter().filter(|t| **t != EMPTY).count()
    }

}
