//! Gravity sample types

use serde::{Deserialize, Serialize};

/// One tri-axial gravity reading in g
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// X-axis (g)
    pub x: f32,
    /// Y-axis (g)
    pub y: f32,
    /// Z-axis (g)
    pub z: f32,
}

impl Sample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The frozen gravity vector that defines the zero angle
pub type ReferenceVector = Sample;

