//! Calibration-gated rotation angle tracking for tri-axial accelerometers
//!
//! Raw gravity samples are median-smoothed per axis. The smoothed vector feeds
//! a dice-face classifier on every tick and, until calibration locks, a gate
//! that freezes a reference gravity vector once enough ticks have elapsed.
//! After that every raw sample yields a planar rotation angle against the
//! reference.
//!
//! # Quick Start
//!
//! ## Feeding Samples Directly
//! ```
//! use accel_angle_tracker::{Sample, TickOutcome, Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(&TrackerConfig::default())?;
//!
//! // Device at rest: the reference locks on the 21st tick
//! for _ in 0..21 {
//!     tracker.feed(Sample::new(1.0, 0.0, 9.8));
//! }
//! assert!(tracker.is_calibrated());
//!
//! // A quarter turn in the XY plane
//! let report = tracker.feed(Sample::new(0.0, 1.0, 9.8));
//! if let TickOutcome::Angle(angle) = report.outcome {
//!     assert!((angle - 90.0).abs() < 1e-3);
//! }
//! # Ok::<(), accel_angle_tracker::TrackerError>(())
//! ```
//!
//! ## Observing Angles
//! ```
//! use accel_angle_tracker::{AngleEvent, PeakAngleReporter, Sample, Tracker, TrackerConfig};
//!
//! let config = TrackerConfig::default();
//! let mut tracker = Tracker::new(&config)?;
//!
//! tracker.add_sink(|event: &AngleEvent| {
//!     println!("face {} angle {:.2}", event.face, event.angle);
//! });
//! tracker.add_sink(PeakAngleReporter::new(
//!     config.peak.dead_band_deg,
//!     config.peak_interval_ticks(),
//!     |peak: f32| println!("peak {:.1}", peak),
//! ));
//!
//! for _ in 0..30 {
//!     tracker.feed(Sample::new(0.7, 0.7, 0.1));
//! }
//! # Ok::<(), accel_angle_tracker::TrackerError>(())
//! ```
//!
//! ## Replaying a Recording
//! ```no_run
//! use accel_angle_tracker::{ReplaySource, StreamControl, Tracker, TrackerConfig};
//!
//! let config = TrackerConfig::load_from_file("tracker.json");
//! let mut tracker = Tracker::new(&config)?;
//! let mut source = ReplaySource::from_jsonl("session.jsonl")?;
//!
//! tracker.stream(&mut source, config.update_interval(), |report| {
//!     println!("tick {} -> {:?}", report.tick, report.outcome);
//!     StreamControl::Continue
//! })?;
//! # Ok::<(), accel_angle_tracker::TrackerError>(())
//! ```

pub mod angle;
pub mod calibration;
pub mod common;
pub mod config;
pub mod dice;
pub mod error;
pub mod observer;
#[cfg(feature = "recording")]
pub mod recording;
pub mod sample;
pub mod smoothing;
pub mod source;
pub mod tracker;

// Re-export public API
pub use angle::{AngleTracker, WrapMode};
pub use calibration::{CalibrationGate, CalibrationState};
pub use common::{create_bar, format_angle, TimeKeeper};
pub use config::{PeakConfig, TrackerConfig};
pub use dice::{Dice, Face};
pub use error::{Result, TrackerError};
pub use observer::{AngleEvent, DiagnosticSink, PeakAngleReporter, TracingSink};
#[cfg(feature = "recording")]
pub use recording::{RecordKind, SessionReader, SessionRecord, SessionWriter};
pub use sample::{ReferenceVector, Sample};
pub use smoothing::{AxisStreams, DataStream};
pub use source::{Accelerometer, ReplaySource};
pub use tracker::{StreamControl, TickOutcome, TickReport, Tracker};
