//! Planar rotation angle relative to the calibration reference
//!
//! The angle is the difference of the XY-plane arctangents of the live sample
//! and the reference, in degrees. `atan(y / x)` only covers (-90, 90), so the
//! difference spans (-180, 180) and is folded back with a wrap correction.
//!
//! Division by zero is left to IEEE-754: `x == 0` gives +/-inf and `atan`
//! turns that into +/-90 degrees, `0 / 0` gives NaN which propagates into the
//! reading. Consumers filter non-finite angles if they care.

use serde::{Deserialize, Serialize};

use crate::sample::{ReferenceVector, Sample};

/// How the arctangent discontinuity is folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Only angles below -90 are folded (`180 + angle`)
    #[default]
    OneSided,
    /// Angles below -90 and above 90 are both folded into [-90, 90]
    Symmetric,
}

impl WrapMode {
    pub fn apply(&self, angle: f32) -> f32 {
        match self {
            WrapMode::OneSided => wrap_one_sided(angle),
            WrapMode::Symmetric => wrap_symmetric(angle),
        }
    }
}

/// Unwrapped angle between `sample` and `reference` in degrees
///
/// Ratios are taken in `f32`, arctangents in `f64`; the radian difference is
/// rounded to `f32` before and after scaling to degrees.
pub fn raw_angle_degrees(sample: &Sample, reference: &ReferenceVector) -> f32 {
    let radians = (f64::from(sample.y / sample.x).atan() - f64::from(reference.y / reference.x).atan()) as f32;
    (f64::from(radians) * (180.0 / std::f64::consts::PI)) as f32
}

pub fn wrap_one_sided(angle: f32) -> f32 {
    if angle < -90.0 {
        180.0 + angle
    } else {
        angle
    }
}

pub fn wrap_symmetric(angle: f32) -> f32 {
    if angle < -90.0 {
        180.0 + angle
    } else if angle > 90.0 {
        angle - 180.0
    } else {
        angle
    }
}

/// Holds the last computed angle
#[derive(Debug, Clone, Default)]
pub struct AngleTracker {
    wrap: WrapMode,
    reading: Option<f32>,
}

impl AngleTracker {
    pub fn new(wrap: WrapMode) -> Self {
        Self {
            wrap,
            reading: None,
        }
    }

    /// Compute, wrap and store the angle for one raw sample
    pub fn update(&mut self, sample: &Sample, reference: &ReferenceVector) -> f32 {
        let angle = self.wrap.apply(raw_angle_degrees(sample, reference));
        self.reading = Some(angle);
        angle
    }

    /// Last computed angle, `None` until the first locked tick
    pub fn reading(&self) -> Option<f32> {
        self.reading
    }

    pub fn clear(&mut self) {
        self.reading = None;
    }
}
