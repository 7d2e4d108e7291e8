//! Accelerometer sources
//!
//! [`Accelerometer`] is the driver contract the tracker consumes: one sample
//! per call, or an error that aborts the current tick. [`ReplaySource`] plays
//! back recorded samples, turning malformed records into read failures so
//! recordings exercise the same error path as a flaky bus.

use std::fs;
use std::path::Path;

use crate::error::{Result, TrackerError};
use crate::sample::Sample;

/// Source of gravity samples, one per tick
pub trait Accelerometer {
    /// Read the current gravity vector in g
    ///
    /// # Returns
    /// * `Ok(Sample)` - Reading for this tick
    /// * `Err(TrackerError::DriverRead)` - Transient failure; the tick is skipped
    /// * `Err(TrackerError::EndOfData)` - The source is exhausted
    fn read_g(&mut self) -> Result<Sample>;
}

/// Plays back a fixed sequence of readings
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    records: Vec<std::result::Result<Sample, String>>,
    position: usize,
}

impl ReplaySource {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self::from_records(samples.into_iter().map(Ok).collect())
    }

    /// Build from readings that may include driver failures
    pub fn from_records(records: Vec<std::result::Result<Sample, String>>) -> Self {
        Self {
            records,
            position: 0,
        }
    }

    /// Parse JSON lines, one `{"x": .., "y": .., "z": ..}` object per line
    ///
    /// Blank lines are skipped. Lines that fail to parse are kept as read
    /// failures at their position in the sequence.
    pub fn parse_jsonl(text: &str) -> Self {
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Sample>(line)
                    .map_err(|e| format!("line {}: {}", i + 1, e))
            })
            .collect();
        Self::from_records(records)
    }

    /// Load a JSON-lines recording from disk
    pub fn from_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse_jsonl(&text))
    }

    /// Total number of records, including failures
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records not yet delivered
    pub fn remaining(&self) -> usize {
        self.records.len() - self.position
    }

    /// Start playback from the beginning
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Accelerometer for ReplaySource {
    fn read_g(&mut self) -> Result<Sample> {
        let record = self.records.get(self.position).ok_or(TrackerError::EndOfData)?;
        self.position += 1;
        record.clone().map_err(TrackerError::DriverRead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_in_order_then_end() {
        let mut source = ReplaySource::from_samples(vec![
            Sample::new(1.0, 0.0, 0.0),
            Sample::new(0.0, 1.0, 0.0),
        ]);
        assert_eq!(source.read_g().unwrap(), Sample::new(1.0, 0.0, 0.0));
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.read_g().unwrap(), Sample::new(0.0, 1.0, 0.0));
        assert!(matches!(source.read_g(), Err(TrackerError::EndOfData)));
        assert!(matches!(source.read_g(), Err(TrackerError::EndOfData)));
    }

    #[test]
    fn test_parse_jsonl_with_bad_line() {
        let text = r#"{"x": 0.0, "y": 0.0, "z": 1.0}

{"x": 0.1, "y": oops}
{"x": 0.2, "y": 0.0, "z": 0.98}
"#;
        let mut source = ReplaySource::parse_jsonl(text);
        assert_eq!(source.len(), 3);

        assert_eq!(source.read_g().unwrap(), Sample::new(0.0, 0.0, 1.0));
        match source.read_g() {
            Err(TrackerError::DriverRead(msg)) => assert!(msg.starts_with("line 3")),
            other => panic!("expected driver read failure, got {:?}", other),
        }
        assert_eq!(source.read_g().unwrap(), Sample::new(0.2, 0.0, 0.98));
        assert!(matches!(source.read_g(), Err(TrackerError::EndOfData)));
    }

    #[test]
    fn test_rewind() {
        let mut source = ReplaySource::from_samples(vec![Sample::new(1.0, 2.0, 3.0)]);
        source.read_g().unwrap();
        assert_eq!(source.remaining(), 0);
        source.rewind();
        assert_eq!(source.read_g().unwrap(), Sample::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_from_jsonl_file() {
        let path = std::env::temp_dir().join("accel_angle_tracker_replay.jsonl");
        fs::write(&path, "{\"x\":1.0,\"y\":0.0,\"z\":9.8}\n").unwrap();
        let mut source = ReplaySource::from_jsonl(&path).unwrap();
        assert_eq!(source.read_g().unwrap(), Sample::new(1.0, 0.0, 9.8));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("accel_angle_tracker_no_such_file.jsonl");
        let _ = fs::remove_file(&path);
        assert!(matches!(ReplaySource::from_jsonl(&path), Err(TrackerError::Io(_))));
    }
}
