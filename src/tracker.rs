//! Per-tick driver
//!
//! [`Tracker`] owns every piece of mutable state: the three axis streams, the
//! classifier, the calibration gate, the last angle and the tick counter. One
//! tick runs to completion before the next one starts, so `&mut self` is the
//! only exclusion needed.

use std::time::{Duration, Instant};

use crate::angle::AngleTracker;
use crate::calibration::{CalibrationGate, CalibrationState, GateOutcome};
use crate::config::TrackerConfig;
use crate::dice::{Dice, Face};
use crate::error::{Result, TrackerError};
use crate::observer::{AngleEvent, DiagnosticSink};
use crate::sample::{ReferenceVector, Sample};
use crate::smoothing::AxisStreams;
use crate::source::Accelerometer;

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Control flow for streaming operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Continue streaming
    Continue,
    /// Stop streaming
    Break,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The driver failed; nothing was updated
    Aborted,
    /// Still waiting for calibration
    Collecting,
    /// The reference was captured on this tick
    Calibrated(ReferenceVector),
    /// A new angle was computed (degrees, possibly non-finite)
    Angle(f32),
}

/// Snapshot handed to stream callbacks after every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Tick count after this tick
    pub tick: u64,
    /// Raw sample, `None` if the tick was aborted
    pub sample: Option<Sample>,
    /// Current per-axis medians
    pub smoothed: Option<Sample>,
    pub face: Face,
    pub outcome: TickOutcome,
}

/// Calibration-gated angle tracker
pub struct Tracker {
    streams: AxisStreams,
    dice: Dice,
    gate: CalibrationGate,
    angle: AngleTracker,
    ticks: u64,
    sinks: Vec<Box<dyn DiagnosticSink>>,
}

impl Tracker {
    /// Create a tracker from a validated configuration
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            streams: AxisStreams::new(config.stream_capacity),
            dice: Dice::new(Face::Unknown),
            gate: CalibrationGate::new(config.calibration_threshold),
            angle: AngleTracker::new(config.wrap),
            ticks: 0,
            sinks: Vec::new(),
        })
    }

    /// Register a sink that sees every computed angle
    pub fn add_sink<S>(&mut self, sink: S)
    where
        S: DiagnosticSink + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    /// Run one tick against a driver
    ///
    /// A transient read failure aborts the tick and is reported as
    /// [`TickOutcome::Aborted`]; no state changes. Any other error (including
    /// [`TrackerError::EndOfData`]) is returned.
    pub fn tick<A>(&mut self, sensor: &mut A) -> Result<TickReport>
    where
        A: Accelerometer + ?Sized,
    {
        match sensor.read_g() {
            Ok(sample) => Ok(self.feed(sample)),
            Err(e) if e.is_transient() => {
                tracing::debug!(tick = self.ticks, "tick aborted: {}", e);
                Ok(TickReport {
                    tick: self.ticks,
                    sample: None,
                    smoothed: self.streams.smoothed(),
                    face: self.dice.face(),
                    outcome: TickOutcome::Aborted,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Process one raw sample
    pub fn feed(&mut self, sample: Sample) -> TickReport {
        self.streams.feed(&sample);
        self.ticks = self.ticks.saturating_add(1);

        let smoothed = self.streams.smoothed();
        if let Some(s) = smoothed {
            self.dice.feed_vectors(s.x, s.y, s.z);
        }
        let face = self.dice.face();

        let outcome = match self.gate.state() {
            CalibrationState::Locked(reference) => {
                // Angle uses the raw sample; smoothing only feeds the classifier and the gate
                let angle = self.angle.update(&sample, &reference);
                let event = AngleEvent {
                    tick: self.ticks,
                    face,
                    angle,
                };
                for sink in self.sinks.iter_mut() {
                    sink.on_angle(&event);
                }
                TickOutcome::Angle(angle)
            }
            CalibrationState::Collecting => {
                match self.gate.observe(self.ticks, self.streams.medians()) {
                    GateOutcome::Locked(reference) => {
                        tracing::info!(
                            tick = self.ticks,
                            "calibrated: reference x={:.3}g y={:.3}g z={:.3}g",
                            reference.x,
                            reference.y,
                            reference.z
                        );
                        TickOutcome::Calibrated(reference)
                    }
                    GateOutcome::Pending | GateOutcome::AlreadyLocked => TickOutcome::Collecting,
                }
            }
        };

        TickReport {
            tick: self.ticks,
            sample: Some(sample),
            smoothed,
            face,
            outcome,
        }
    }

    /// Stream samples at a fixed period until the callback stops or the source ends
    ///
    /// # Arguments
    /// * `sensor` - Sample source
    /// * `interval` - Tick period, at least 1 ms
    /// * `callback` - Called after every tick, including aborted ones
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of ticks run
    /// * `Err(TrackerError)` - Invalid interval or a non-transient source error
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use accel_angle_tracker::{ReplaySource, Sample, StreamControl, Tracker, TrackerConfig};
    ///
    /// let mut tracker = Tracker::new(&TrackerConfig::default())?;
    /// let mut source = ReplaySource::from_samples(vec![Sample::new(1.0, 0.0, 0.0); 5]);
    ///
    /// let ticks = tracker.stream(&mut source, Duration::from_millis(1), |_report| StreamControl::Continue)?;
    /// assert_eq!(ticks, 5);
    /// # Ok::<(), accel_angle_tracker::TrackerError>(())
    /// ```
    pub fn stream<A, F>(&mut self, sensor: &mut A, interval: Duration, callback: F) -> Result<u64>
    where
        A: Accelerometer + ?Sized,
        F: FnMut(&TickReport) -> StreamControl,
    {
        if interval < MIN_TICK_INTERVAL {
            return Err(TrackerError::InvalidParameter(format!(
                "Tick interval must be at least 1 ms, got {:?}",
                interval
            )));
        }

        self.run(sensor, Some(interval), callback)
    }

    /// Run every available sample through the tracker without pacing
    pub fn drain<A, F>(&mut self, sensor: &mut A, callback: F) -> Result<u64>
    where
        A: Accelerometer + ?Sized,
        F: FnMut(&TickReport) -> StreamControl,
    {
        self.run(sensor, None, callback)
    }

    fn run<A, F>(&mut self, sensor: &mut A, interval: Option<Duration>, mut callback: F) -> Result<u64>
    where
        A: Accelerometer + ?Sized,
        F: FnMut(&TickReport) -> StreamControl,
    {
        let mut tick_count = 0u64;
        let mut next_tick_time = Instant::now();

        loop {
            let report = match self.tick(sensor) {
                Ok(report) => report,
                Err(TrackerError::EndOfData) => break,
                Err(e) => return Err(e),
            };
            tick_count += 1;

            if callback(&report) == StreamControl::Break {
                break;
            }

            if let Some(interval) = interval {
                // Wait until next tick; if running behind, continue immediately
                next_tick_time += interval;
                let now = Instant::now();
                if next_tick_time > now {
                    std::thread::sleep(next_tick_time - now);
                }
            }
        }

        Ok(tick_count)
    }

    /// Last computed angle in degrees, `None` until calibrated
    pub fn angle(&self) -> Option<f32> {
        self.angle.reading()
    }

    /// Current face label
    pub fn face(&self) -> Face {
        self.dice.face()
    }

    pub fn state(&self) -> CalibrationState {
        self.gate.state()
    }

    pub fn is_calibrated(&self) -> bool {
        self.gate.is_locked()
    }

    pub fn reference(&self) -> Option<ReferenceVector> {
        self.gate.reference().copied()
    }

    /// Current per-axis medians
    pub fn smoothed(&self) -> Option<Sample> {
        self.streams.smoothed()
    }

    /// Successful ticks since creation or the last reset
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Forget the reference and recalibrate from scratch
    ///
    /// Clears the angle, the smoothing buffers and the tick counter; the face
    /// label is kept. Registered sinks are reset too, since tick numbers
    /// restart. Calibration locks again after `threshold + 1` ticks.
    pub fn reset(&mut self) {
        tracing::info!(tick = self.ticks, "calibration reset");
        self.gate.reset();
        self.angle.clear();
        self.streams.reset();
        self.ticks = 0;
        for sink in self.sinks.iter_mut() {
            sink.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::WrapMode;
    use crate::observer::PeakAngleReporter;
    use crate::source::ReplaySource;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FLAT: Sample = Sample { x: 1.0, y: 0.0, z: 9.8 };
    const EPS: f32 = 1e-4;

    fn tracker() -> Tracker {
        Tracker::new(&TrackerConfig::default()).unwrap()
    }

    fn calibrate(tracker: &mut Tracker, sample: Sample) {
        while !tracker.is_calibrated() {
            tracker.feed(sample);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TrackerConfig {
            stream_capacity: 0,
            ..TrackerConfig::default()
        };
        assert!(Tracker::new(&config).is_err());
    }

    #[test]
    fn test_locks_on_tick_21() {
        let mut tracker = tracker();
        for _ in 0..20 {
            let report = tracker.feed(FLAT);
            assert_eq!(report.outcome, TickOutcome::Collecting);
            assert_eq!(tracker.angle(), None);
            assert_eq!(tracker.reference(), None);
        }

        let report = tracker.feed(FLAT);
        assert_eq!(report.tick, 21);
        assert_eq!(report.outcome, TickOutcome::Calibrated(FLAT));
        // No angle on the locking tick itself
        assert_eq!(tracker.angle(), None);

        let report = tracker.feed(FLAT);
        assert!(matches!(report.outcome, TickOutcome::Angle(a) if a.abs() < EPS));
    }

    #[test]
    fn test_reference_is_median_of_window() {
        let config = TrackerConfig {
            stream_capacity: 5,
            calibration_threshold: 4,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(&config).unwrap();
        for y in [0.0, 0.1, 3.0, 0.2, 0.1] {
            tracker.feed(Sample::new(1.0, y, 9.8));
        }
        assert_eq!(tracker.reference(), Some(Sample::new(1.0, 0.1, 9.8)));
    }

    #[test]
    fn test_quarter_turn_reading() {
        let mut tracker = tracker();
        calibrate(&mut tracker, FLAT);

        tracker.feed(Sample::new(0.0, 1.0, 9.8));
        let angle = tracker.angle().unwrap();
        assert!((angle - 90.0).abs() < EPS, "angle = {}", angle);
    }

    #[test]
    fn test_reference_unchanged_by_later_samples() {
        let mut tracker = tracker();
        calibrate(&mut tracker, FLAT);

        for i in 0..100 {
            tracker.feed(Sample::new(-(i as f32), 3.0, 0.5));
            assert_eq!(tracker.reference(), Some(FLAT));
            assert!(tracker.is_calibrated());
        }
    }

    #[test]
    fn test_driver_failure_aborts_tick() {
        let mut tracker = tracker();
        calibrate(&mut tracker, FLAT);
        tracker.feed(Sample::new(1.0, 1.0, 9.8));

        let before = (
            tracker.smoothed(),
            tracker.tick_count(),
            tracker.state(),
            tracker.reference(),
            tracker.angle(),
            tracker.face(),
        );

        let mut source = ReplaySource::from_records(vec![Err("bus timeout".to_string())]);
        let report = tracker.tick(&mut source).unwrap();
        assert_eq!(report.outcome, TickOutcome::Aborted);
        assert_eq!(report.sample, None);

        let after = (
            tracker.smoothed(),
            tracker.tick_count(),
            tracker.state(),
            tracker.reference(),
            tracker.angle(),
            tracker.face(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_driver_failure_does_not_advance_calibration() {
        let mut tracker = tracker();
        let mut records: Vec<std::result::Result<Sample, String>> = Vec::new();
        for _ in 0..20 {
            records.push(Ok(FLAT));
            records.push(Err("nack".to_string()));
        }
        let mut source = ReplaySource::from_records(records);
        tracker.drain(&mut source, |_| StreamControl::Continue).unwrap();

        assert_eq!(tracker.tick_count(), 20);
        assert!(!tracker.is_calibrated());
    }

    #[test]
    fn test_end_of_data_propagates_from_tick() {
        let mut tracker = tracker();
        let mut source = ReplaySource::default();
        assert!(matches!(tracker.tick(&mut source), Err(TrackerError::EndOfData)));
    }

    #[test]
    fn test_sinks_see_every_angle() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = events.clone();

        let mut tracker = tracker();
        tracker.add_sink(move |e: &AngleEvent| seen.borrow_mut().push(*e));

        calibrate(&mut tracker, FLAT);
        assert!(events.borrow().is_empty());

        tracker.feed(Sample::new(0.0, 1.0, 9.8));
        tracker.feed(FLAT);

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick, 22);
        assert_eq!(events[0].face, Face::One);
        assert!((events[0].angle - 90.0).abs() < EPS);
        assert!(events[1].angle.abs() < EPS);
    }

    #[test]
    fn test_peak_reporter_wired_as_sink() {
        let peaks = Rc::new(RefCell::new(Vec::new()));
        let out = peaks.clone();

        let mut tracker = tracker();
        tracker.add_sink(PeakAngleReporter::new(5.0, 10, move |p: f32| out.borrow_mut().push(p)));
        calibrate(&mut tracker, FLAT);

        tracker.feed(Sample::new(1.0, 0.01, 9.8));
        assert!(peaks.borrow().is_empty());

        tracker.feed(Sample::new(1.0, 1.0, 9.8));
        assert_eq!(peaks.borrow().len(), 1);
        assert!((peaks.borrow()[0] - 45.0).abs() < EPS);
    }

    #[test]
    fn test_face_tracks_smoothed_vector() {
        let mut tracker = tracker();
        assert_eq!(tracker.face(), Face::Unknown);
        for _ in 0..10 {
            tracker.feed(Sample::new(0.0, 0.0, 1.0));
        }
        assert_eq!(tracker.face(), Face::One);
        // A single spike is filtered by the median
        let report = tracker.feed(Sample::new(0.0, 0.0, -1.0));
        assert_eq!(report.face, Face::One);
    }

    #[test]
    fn test_symmetric_wrap_from_config() {
        let config = TrackerConfig {
            wrap: WrapMode::Symmetric,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(&config).unwrap();
        let reference = Sample::new(1.0, -2.0, 0.0);
        calibrate(&mut tracker, reference);

        // Raw angle is about +126.87 degrees
        tracker.feed(Sample::new(1.0, 2.0, 0.0));
        let angle = tracker.angle().unwrap();
        assert!((angle - (126.869_9 - 180.0)).abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_reset_recalibrates() {
        let mut tracker = tracker();
        calibrate(&mut tracker, FLAT);
        tracker.feed(FLAT);
        assert!(tracker.angle().is_some());

        tracker.reset();
        assert_eq!(tracker.state(), CalibrationState::Collecting);
        assert_eq!(tracker.angle(), None);
        assert_eq!(tracker.tick_count(), 0);
        assert_eq!(tracker.smoothed(), None);

        let other = Sample::new(0.0, 1.0, 9.8);
        let mut locked_at = None;
        for _ in 0..30 {
            if let TickOutcome::Calibrated(_) = tracker.feed(other).outcome {
                locked_at = Some(tracker.tick_count());
            }
        }
        assert_eq!(locked_at, Some(21));
        assert_eq!(tracker.reference(), Some(other));
    }

    #[test]
    fn test_peak_reporter_publishes_after_reset() {
        let peaks = Rc::new(RefCell::new(Vec::new()));
        let out = peaks.clone();
        let tilted = Sample::new(1.0, 1.0, 9.8);

        let mut tracker = tracker();
        tracker.add_sink(PeakAngleReporter::new(5.0, 10, move |p: f32| out.borrow_mut().push(p)));
        calibrate(&mut tracker, FLAT);
        for _ in 0..100 {
            tracker.feed(FLAT);
        }
        tracker.feed(tilted);
        assert_eq!(peaks.borrow().len(), 1);

        tracker.reset();
        calibrate(&mut tracker, FLAT);
        assert_eq!(tracker.tick_count(), 21);

        // Ticks 22..=41: publishes on 22 and 33
        for _ in 0..20 {
            tracker.feed(tilted);
        }
        let peaks = peaks.borrow();
        assert_eq!(peaks.len(), 3);
        assert!(peaks.iter().all(|p| (p - 45.0).abs() < EPS));
    }

    #[test]
    fn test_demo_rotation_recording() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        let config = TrackerConfig::try_load(dir.join("tracker.json")).unwrap();
        let mut source = ReplaySource::from_jsonl(dir.join("rotation.jsonl")).unwrap();
        let mut tracker = Tracker::new(&config).unwrap();

        let mut aborted = 0;
        let mut max_angle = f32::MIN;
        tracker
            .drain(&mut source, |report| {
                match report.outcome {
                    TickOutcome::Aborted => aborted += 1,
                    TickOutcome::Angle(a) => max_angle = max_angle.max(a),
                    _ => {}
                }
                StreamControl::Continue
            })
            .unwrap();

        assert_eq!(aborted, 1);
        assert_eq!(tracker.tick_count(), 122);
        assert!(tracker.is_calibrated());
        // The quarter-turn sample has x == 0, so atan(inf) puts the peak right at 90;
        // past it the one-sided wrap reads negative
        assert!(max_angle > 89.0 && max_angle < 91.0, "max = {}", max_angle);
        assert!(tracker.angle().unwrap().abs() < 1.5);
    }

    #[test]
    fn test_stream_rejects_bad_interval() {
        let mut tracker = tracker();
        let mut source = ReplaySource::from_samples(vec![FLAT]);
        assert!(tracker.stream(&mut source, Duration::ZERO, |_| StreamControl::Continue).is_err());
        assert!(tracker
            .stream(&mut source, Duration::from_micros(999), |_| StreamControl::Continue)
            .is_err());
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_stream_paces_by_configured_interval() {
        let config = TrackerConfig {
            update_interval_ms: 30,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(&config).unwrap();
        let mut source = ReplaySource::from_samples(vec![FLAT; 4]);

        let start = Instant::now();
        let ticks = tracker
            .stream(&mut source, config.update_interval(), |_| StreamControl::Continue)
            .unwrap();
        assert_eq!(ticks, 4);
        // Sleeps follow every tick, including the last
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_stream_stops_on_break() {
        let mut tracker = tracker();
        let mut source = ReplaySource::from_samples(vec![FLAT; 50]);
        let ticks = tracker
            .stream(&mut source, Duration::from_millis(1), |report| {
                if report.tick >= 3 {
                    StreamControl::Break
                } else {
                    StreamControl::Continue
                }
            })
            .unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(source.remaining(), 47);
    }

    #[test]
    fn test_drain_counts_aborted_ticks() {
        let mut tracker = tracker();
        let mut source = ReplaySource::from_records(vec![Ok(FLAT), Err("x".to_string()), Ok(FLAT)]);
        let mut outcomes = Vec::new();
        let ticks = tracker
            .drain(&mut source, |report| {
                outcomes.push(report.outcome);
                StreamControl::Continue
            })
            .unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(tracker.tick_count(), 2);
        assert_eq!(
            outcomes,
            vec![TickOutcome::Collecting, TickOutcome::Aborted, TickOutcome::Collecting]
        );
    }
}
