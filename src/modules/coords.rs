use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinates {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn origin() -> Self {
        Self { x: 0, y: 0, z: 0 }
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl Add for Coordinates {
    type Output = Coordinates;

    fn add(self, delta: Coordinates) -> Coordinates {
        self.offset(delta.x, delta.y, delta.z)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Upper bound on the number of cells in one grid.
pub const MAX_CELLS: usize = 1 << 28;

/// Extent of a grid along each axis. Fixed once a world is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl Dimensions {
    pub const fn new(width: i32, height: i32, depth: i32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub const fn is_positive(self) -> bool {
        self.width > 0 && self.height > 0 && self.depth > 0
    }

    /// Positive on every axis and no larger than [`MAX_CELLS`].
    pub fn is_valid(self) -> bool {
        self.checked_volume().is_some()
    }

    /// Cell count, or `None` for non-positive extents or grids over
    /// [`MAX_CELLS`].
    pub fn checked_volume(self) -> Option<usize> {
        if !self.is_positive() {
            return None;
        }
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.depth as usize)
            .filter(|v| *v <= MAX_CELLS)
    }

    /// Cell count; 0 for invalid dimensions.
    pub fn volume(self) -> usize {
        self.checked_volume().unwrap_or(0)
    }

    pub const fn contains(self, c: Coordinates) -> bool {
        c.x >= 0
            && c.y >= 0
            && c.z >= 0
            && c.x < self.width
            && c.y < self.height
            && c.z < self.depth
    }

    /// Flat index in scan order: x-major, then y, then z.
    pub fn index_of(self, c: Coordinates) -> Option<usize> {
        if !self.contains(c) || !self.is_valid() {
            return None;
        }
        let (h, d) = (self.height as usize, self.depth as usize);
        Some((c.x as usize * h + c.y as usize) * d + c.z as usize)
    }

    pub fn coordinates_of(self, index: usize) -> Option<Coordinates> {
        if index >= self.volume() {
            return None;
        }
        let (h, d) = (self.height as usize, self.depth as usize);
        Some(Coordinates {
            x: (index / (h * d)) as i32,
            y: ((index / d) % h) as i32,
            z: (index % d) as i32,
        })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
    Place,
    Remove,
    /// Terminates an input poll; never recorded.
    None,
}

/// Every action a policy may choose, excluding the `None` terminator.
pub const ALL_ACTIONS: [Action; 8] = [
    Action::Up,
    Action::Down,
    Action::Left,
    Action::Right,
    Action::Forward,
    Action::Backward,
    Action::Place,
    Action::Remove,
];

impl Action {
    /// Unit step for movement actions.
    pub const fn delta(self) -> Option<Coordinates> {
        match self {
            Action::Up => Some(Coordinates::new(0, 1, 0)),
            Action::Down => Some(Coordinates::new(0, -1, 0)),
            Action::Left => Some(Coordinates::new(-1, 0, 0)),
            Action::Right => Some(Coordinates::new(1, 0, 0)),
            Action::Forward => Some(Coordinates::new(0, 0, 1)),
            Action::Backward => Some(Coordinates::new(0, 0, -1)),
            Action::Place | Action::Remove | Action::None => None,
        }
    }

    pub const fn is_movement(self) -> bool {
        self.delta().is_some()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Place => "place",
            Action::Remove => "remove",
            Action::None => "none",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "e" => Ok(Action::Up),
            "down" | "q" => Ok(Action::Down),
            "left" | "a" => Ok(Action::Left),
            "right" | "d" => Ok(Action::Right),
            "forward" | "w" => Ok(Action::Forward),
            "backward" | "back" | "s" => Ok(Action::Backward),
            "place" | "p" => Ok(Action::Place),
            "remove" | "r" => Ok(Action::Remove),
            "none" => Ok(Action::None),
            other => Err(format!(
                "unknown action '{}'; expected up|down|left|right|forward|backward|place|remove|none",
                other
            )),
        }
    }
}
