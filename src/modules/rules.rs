use std::fmt;

use crate::modules::coords::Coordinates;
use crate::modules::grid::{EMPTY, Grid};

/// Why an action left the world untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    OutOfBounds { target: Coordinates },
    Occupied { target: Coordinates },
    Empty { target: Coordinates },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OutOfBounds { target } => write!(f, "{} is out of bounds", target),
            Rejection::Occupied { target } => write!(f, "{} is already occupied", target),
            Rejection::Empty { target } => write!(f, "{} has no block to remove", target),
        }
    }
}

pub fn check_place(grid: &Grid, c: Coordinates) -> Result<(), Rejection> {
    match grid.get(c) {
        Err(_) => Err(Rejection::OutOfBounds { target: c }),
        Ok(EMPTY) => Ok(()),
        Ok(_) => Err(Rejection::Occupied { target: c }),
    }
}

pub fn check_remove(grid: &Grid, c: Coordinates) -> Result<(), Rejection> {
    match grid.get(c) {
        Err(_) => Err(Rejection::OutOfBounds { target: c }),
        Ok(EMPTY) => Err(Rejection::Empty { target: c }),
        Ok(_) => Ok(()),
    }
}

/// In bounds and currently empty.
pub fn can_place(grid: &Grid, c: Coordinates) -> bool {
    check_place(grid, c).is_ok()
}

/// In bounds and currently holding a block.
pub fn can_remove(grid: &Grid, c: Coordinates) -> bool {
    check_remove(grid, c).is_ok()
}
