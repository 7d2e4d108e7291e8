//! Calibration gate
//!
//! Decides once when enough samples have been smoothed to trust a reference
//! orientation, then freezes the per-axis medians as the reference vector.
//! The gate never re-opens on its own; [`CalibrationGate::reset`] is the only
//! way back to collecting.

use crate::sample::{ReferenceVector, Sample};

/// Default number of ticks that must have elapsed before locking
pub const DEFAULT_CALIBRATION_THRESHOLD: u64 = 20;

/// Calibration state; the reference only exists once locked
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Collecting,
    Locked(ReferenceVector),
}

impl CalibrationState {
    pub fn is_locked(&self) -> bool {
        matches!(self, CalibrationState::Locked(_))
    }

    pub fn reference(&self) -> Option<&ReferenceVector> {
        match self {
            CalibrationState::Locked(reference) => Some(reference),
            CalibrationState::Collecting => None,
        }
    }
}

/// Outcome of offering one tick to the gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    /// Not enough ticks yet, or a median was unavailable
    Pending,
    /// The gate locked on this tick
    Locked(ReferenceVector),
    /// The gate was already locked; nothing changed
    AlreadyLocked,
}

/// Single-shot reference capture
#[derive(Debug, Clone)]
pub struct CalibrationGate {
    threshold: u64,
    state: CalibrationState,
}

impl CalibrationGate {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            state: CalibrationState::Collecting,
        }
    }

    /// Offer one tick to the gate
    ///
    /// # Arguments
    /// * `tick_count` - Ticks fed since creation or last reset
    /// * `medians` - Per-axis medians; any `None` defers locking to a later tick
    pub fn observe(&mut self, tick_count: u64, medians: [Option<f32>; 3]) -> GateOutcome {
        if self.state.is_locked() {
            return GateOutcome::AlreadyLocked;
        }

        if tick_count <= self.threshold {
            return GateOutcome::Pending;
        }

        let [Some(x), Some(y), Some(z)] = medians else {
            return GateOutcome::Pending;
        };

        let reference = Sample::new(x, y, z);
        self.state = CalibrationState::Locked(reference);
        GateOutcome::Locked(reference)
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    pub fn reference(&self) -> Option<&ReferenceVector> {
        self.state.reference()
    }

    /// Drop the reference and start collecting again
    ///
    /// Used after the device has been physically repositioned.
    pub fn reset(&mut self) {
        self.state = CalibrationState::Collecting;
    }
}

impl Default for CalibrationGate {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_THRESHOLD)
    }
}
