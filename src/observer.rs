//! Observers for computed angles
//!
//! The tracker never logs or publishes angles itself. Anything that wants to
//! see them registers a [`DiagnosticSink`]; sinks are called synchronously on
//! the tick and must return quickly.

use crate::dice::Face;

/// One angle computation, as seen by sinks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleEvent {
    /// Tick count at which the angle was computed
    pub tick: u64,
    /// Face reported by the classifier on the same tick
    pub face: Face,
    /// Wrapped angle in degrees; may be non-finite
    pub angle: f32,
}

/// Receives every computed angle
pub trait DiagnosticSink {
    fn on_angle(&mut self, event: &AngleEvent);

    /// Called when the tracker recalibrates; tick numbers restart after this
    fn reset(&mut self) {}
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&AngleEvent),
{
    fn on_angle(&mut self, event: &AngleEvent) {
        self(event)
    }
}

/// Logs each angle at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn on_angle(&mut self, event: &AngleEvent) {
        tracing::debug!(tick = event.tick, face = %event.face, "dice {}", event.face);
        tracing::debug!(tick = event.tick, "angle {:.2}", event.angle);
    }
}

/// Publishes the largest absolute angle seen in each reporting window
///
/// Angles within `+/-dead_band` of the reference are treated as "at rest" and
/// ignored entirely. The window only closes on an angle outside the dead
/// band, so a device at rest publishes nothing.
pub struct PeakAngleReporter<P> {
    dead_band: f32,
    interval_ticks: u64,
    next_publish_tick: u64,
    peak: f32,
    publish: P,
}

impl<P> PeakAngleReporter<P>
where
    P: FnMut(f32),
{
    /// # Arguments
    /// * `dead_band` - Absolute angle (degrees) below which readings are ignored
    /// * `interval_ticks` - Minimum ticks between two publishes
    /// * `publish` - Called with the window's peak absolute angle
    pub fn new(dead_band: f32, interval_ticks: u64, publish: P) -> Self {
        Self {
            dead_band: dead_band.abs(),
            interval_ticks,
            next_publish_tick: 0,
            peak: 0.0,
            publish,
        }
    }

    /// Peak of the currently open window
    pub fn peak(&self) -> f32 {
        self.peak
    }
}

impl<P> DiagnosticSink for PeakAngleReporter<P>
where
    P: FnMut(f32),
{
    fn on_angle(&mut self, event: &AngleEvent) {
        let angle = event.angle;
        if angle < self.dead_band && angle > -self.dead_band {
            return;
        }

        // NaN never compares greater, so it cannot become the peak
        let magnitude = angle.abs();
        if magnitude > self.peak {
            self.peak = magnitude;
        }

        if self.next_publish_tick < event.tick {
            (self.publish)(self.peak);
            self.peak = 0.0;
            self.next_publish_tick = event.tick + self.interval_ticks;
        }
    }

    fn reset(&mut self) {
        self.peak = 0.0;
        self.next_publish_tick = 0;
    }
}
