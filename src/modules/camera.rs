use serde::{Deserialize, Serialize};

/// Viewing pose handed to presenters alongside each frame. The engine never
/// reads it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [6.5, 8.5, 8.5],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fovy: 45.0,
        }
    }
}
