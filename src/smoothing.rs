//! Per-axis median smoothing
//!
//! Each axis is fed into its own fixed-capacity circular buffer. The median is
//! computed on demand over whatever is currently buffered, so a single spike
//! never reaches the classifier or the calibration reference.

use crate::sample::Sample;

/// Fixed-capacity median filter over the most recent samples of one axis
#[derive(Debug, Clone)]
pub struct DataStream {
    buffer: Vec<f32>,
    capacity: usize,
    head: usize,
    min_samples: usize,
    counter: u64,
}

impl DataStream {
    /// Create a stream holding at most `capacity` values
    ///
    /// `min_samples` is the number of buffered values required before
    /// [`DataStream::median`] returns a value (clamped to `1..=capacity`).
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            min_samples: min_samples.clamp(1, capacity),
            counter: 0,
        }
    }

    /// Push one value, overwriting the oldest once full
    pub fn feed(&mut self, value: f32) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(value);
        } else {
            self.buffer[self.head] = value;
        }
        self.head = (self.head + 1) % self.capacity;
        self.counter = self.counter.saturating_add(1);
    }

    /// Median of the buffered values
    ///
    /// Even fill returns the mean of the two middle values. NaN sorts last.
    pub fn median(&self) -> Option<f32> {
        if self.buffer.len() < self.min_samples {
            return None;
        }

        let mut sorted = self.buffer.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Number of values fed since creation or the last reset
    ///
    /// Keeps counting after the buffer wraps.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of values currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.head = 0;
        self.counter = 0;
    }
}

/// Three synchronously fed axis streams
#[derive(Debug, Clone)]
pub struct AxisStreams {
    pub x: DataStream,
    pub y: DataStream,
    pub z: DataStream,
}

impl AxisStreams {
    pub fn new(capacity: usize) -> Self {
        Self {
            x: DataStream::new(capacity, 1),
            y: DataStream::new(capacity, 1),
            z: DataStream::new(capacity, 1),
        }
    }

    pub fn feed(&mut self, sample: &Sample) {
        self.x.feed(sample.x);
        self.y.feed(sample.y);
        self.z.feed(sample.z);
    }

    /// Per-axis medians, each `None` when that stream cannot answer yet
    pub fn medians(&self) -> [Option<f32>; 3] {
        [self.x.median(), self.y.median(), self.z.median()]
    }

    /// The smoothed triple, if all three medians are available
    pub fn smoothed(&self) -> Option<Sample> {
        match self.medians() {
            [Some(x), Some(y), Some(z)] => Some(Sample::new(x, y, z)),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }
}
