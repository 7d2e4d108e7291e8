//! Dice-face orientation classifier
//!
//! Maps a smoothed gravity vector onto one of six faces of a cube. Opposite
//! faces sum to seven, as on a real die. When the vector does not point
//! clearly along one axis the previous face is kept.

use std::fmt;

/// Maximum per-component distance from an axis unit vector to match a face
const FACE_THRESHOLD: f32 = 0.4;

// Unit vectors for faces One..=Six
const FACE_VECTORS: [[f32; 3]; 6] = [
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, -1.0],
];

/// Face label produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Face {
    /// No face has matched yet
    #[default]
    Unknown,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl Face {
    const FACES: [Face; 6] = [Face::One, Face::Two, Face::Three, Face::Four, Face::Five, Face::Six];

    /// Numeric label, 0 for `Unknown`
    pub fn index(&self) -> u8 {
        match self {
            Face::Unknown => 0,
            Face::One => 1,
            Face::Two => 2,
            Face::Three => 3,
            Face::Four => 4,
            Face::Five => 5,
            Face::Six => 6,
        }
    }

    /// Inverse of [`Face::index`]; anything out of range is `Unknown`
    pub fn from_index(index: u8) -> Self {
        match index {
            1..=6 => Self::FACES[(index - 1) as usize],
            _ => Face::Unknown,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Unknown => write!(f, "unknown"),
            face => write!(f, "{}", face.index()),
        }
    }
}

/// Orientation classifier
#[derive(Debug, Clone, Default)]
pub struct Dice {
    face: Face,
}

impl Dice {
    pub fn new(initial: Face) -> Self {
        Self { face: initial }
    }

    /// Classify one smoothed gravity vector
    pub fn feed_vectors(&mut self, x: f32, y: f32, z: f32) {
        let length = (x * x + y * y + z * z).sqrt();
        let v = [x / length, y / length, z / length];

        // NaN components (zero-length input) never match, keeping the last face
        let matched = FACE_VECTORS.iter().position(|axis| {
            axis.iter()
                .zip(v.iter())
                .all(|(a, c)| (c - a).abs() < FACE_THRESHOLD)
        });

        if let Some(i) = matched {
            self.face = Face::FACES[i];
        }
    }

    pub fn face(&self) -> Face {
        self.face
    }
}
