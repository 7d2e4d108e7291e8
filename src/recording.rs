//! HDF5 session recording
//!
//! Stores a tracker session tick by tick so it can be inspected offline or
//! replayed through a fresh tracker. Every tick carries an outcome code, so
//! aborted ticks come back as driver read failures on replay and a NaN angle
//! stays distinct from a tick that computed no angle.

use hdf5::{Dataset, File, Group};
use std::path::Path;

use crate::config::TrackerConfig;
use crate::dice::Face;
use crate::error::{Result, TrackerError};
use crate::sample::Sample;
use crate::source::ReplaySource;
use crate::tracker::{TickOutcome, TickReport};

const FORMAT_VERSION: &str = "1.1";

fn recording_error(context: &str) -> impl FnOnce(hdf5::Error) -> TrackerError + '_ {
    move |e| TrackerError::Recording(format!("{}: {}", context, e))
}

/// What a recorded tick did, stored as the `outcome` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Aborted,
    Collecting,
    Calibrated,
    Angle,
}

impl RecordKind {
    fn code(self) -> u8 {
        match self {
            RecordKind::Aborted => 0,
            RecordKind::Collecting => 1,
            RecordKind::Calibrated => 2,
            RecordKind::Angle => 3,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(RecordKind::Aborted),
            1 => Ok(RecordKind::Collecting),
            2 => Ok(RecordKind::Calibrated),
            3 => Ok(RecordKind::Angle),
            other => Err(TrackerError::Recording(format!("Unknown outcome code {}", other))),
        }
    }
}

impl From<&TickOutcome> for RecordKind {
    fn from(outcome: &TickOutcome) -> Self {
        match outcome {
            TickOutcome::Aborted => RecordKind::Aborted,
            TickOutcome::Collecting => RecordKind::Collecting,
            TickOutcome::Calibrated(_) => RecordKind::Calibrated,
            TickOutcome::Angle(_) => RecordKind::Angle,
        }
    }
}

/// One recorded tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionRecord {
    /// Seconds since the session started
    pub timestamp: f64,
    pub kind: RecordKind,
    /// Raw sample, `None` for an aborted tick
    pub sample: Option<Sample>,
    /// Angle computed on this tick; `Some(NaN)` is a real degenerate reading
    pub angle: Option<f32>,
    pub face: Face,
    /// Whether the tracker was calibrated after this tick
    pub locked: bool,
}

impl SessionRecord {
    pub fn from_report(timestamp: f64, report: &TickReport, locked: bool) -> Self {
        let angle = match report.outcome {
            TickOutcome::Angle(angle) => Some(angle),
            _ => None,
        };
        Self {
            timestamp,
            kind: RecordKind::from(&report.outcome),
            sample: report.sample,
            angle,
            face: report.face,
            locked,
        }
    }
}

/// Metadata stored in the `metadata` group
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    pub start_time: String,
    pub update_interval_ms: u64,
    pub calibration_threshold: u64,
    pub stream_capacity: u64,
    pub version: String,
}

struct DatasetHandles {
    timestamps: Dataset,
    outcome: Dataset,
    x: Dataset,
    y: Dataset,
    z: Dataset,
    angle: Dataset,
    face: Dataset,
    locked: Dataset,
}

impl DatasetHandles {
    fn open(group: &Group) -> Result<Self> {
        let open = |name: &str| {
            group
                .dataset(name)
                .map_err(|e| TrackerError::Recording(format!("Failed to open {} dataset: {}", name, e)))
        };
        Ok(Self {
            timestamps: open("timestamps")?,
            outcome: open("outcome")?,
            x: open("x")?,
            y: open("y")?,
            z: open("z")?,
            angle: open("angle")?,
            face: open("face")?,
            locked: open("locked")?,
        })
    }
}

/// Appends session records to an HDF5 file
pub struct SessionWriter {
    file: File,
    datasets: DatasetHandles,
    record_count: usize,
}

impl SessionWriter {
    /// Create a new session file, writing the tracker configuration as metadata
    pub fn create<P: AsRef<Path>>(path: P, config: &TrackerConfig) -> Result<Self> {
        let file = File::create(path).map_err(recording_error("Failed to create HDF5 file"))?;

        let metadata = file
            .create_group("metadata")
            .map_err(recording_error("Failed to create metadata group"))?;

        let start_time = chrono::Local::now().to_rfc3339();
        Self::write_str_attr(&metadata, "start_time", &start_time)?;
        Self::write_str_attr(&metadata, "version", FORMAT_VERSION)?;
        Self::write_u64_attr(&metadata, "update_interval_ms", config.update_interval_ms)?;
        Self::write_u64_attr(&metadata, "calibration_threshold", config.calibration_threshold)?;
        Self::write_u64_attr(&metadata, "stream_capacity", config.stream_capacity as u64)?;

        let group = file
            .create_group("session")
            .map_err(recording_error("Failed to create session group"))?;

        let chunk_size = 1024;
        let datasets = DatasetHandles {
            timestamps: Self::create_dataset::<f64>(&group, "timestamps", chunk_size)?,
            outcome: Self::create_dataset::<u8>(&group, "outcome", chunk_size)?,
            x: Self::create_dataset::<f32>(&group, "x", chunk_size)?,
            y: Self::create_dataset::<f32>(&group, "y", chunk_size)?,
            z: Self::create_dataset::<f32>(&group, "z", chunk_size)?,
            angle: Self::create_dataset::<f32>(&group, "angle", chunk_size)?,
            face: Self::create_dataset::<u8>(&group, "face", chunk_size)?,
            locked: Self::create_dataset::<u8>(&group, "locked", chunk_size)?,
        };

        Ok(Self {
            file,
            datasets,
            record_count: 0,
        })
    }

    fn write_str_attr(group: &Group, name: &str, value: &str) -> Result<()> {
        let value: hdf5::types::VarLenUnicode = value
            .parse()
            .map_err(|e| TrackerError::Recording(format!("Invalid {} value: {}", name, e)))?;
        group
            .new_attr::<hdf5::types::VarLenUnicode>()
            .create(name)
            .and_then(|attr| attr.write_scalar(&value))
            .map_err(|e| TrackerError::Recording(format!("Failed to write {}: {}", name, e)))
    }

    fn write_u64_attr(group: &Group, name: &str, value: u64) -> Result<()> {
        group
            .new_attr::<u64>()
            .create(name)
            .and_then(|attr| attr.write_scalar(&value))
            .map_err(|e| TrackerError::Recording(format!("Failed to write {}: {}", name, e)))
    }

    /// Create a resizable, chunked, compressed dataset
    fn create_dataset<T: hdf5::H5Type>(group: &Group, name: &str, chunk_size: usize) -> Result<Dataset> {
        group
            .new_dataset::<T>()
            .shape((0..,))
            .chunk((chunk_size,))
            .deflate(4)
            .create(name)
            .map_err(|e| TrackerError::Recording(format!("Failed to create dataset {}: {}", name, e)))
    }

    pub fn append_batch(&mut self, records: &[SessionRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let new_size = self.record_count + records.len();
        let axis = |f: fn(&Sample) -> f32| -> Vec<f32> {
            records
                .iter()
                .map(|r| r.sample.as_ref().map_or(f32::NAN, f))
                .collect()
        };

        let timestamps: Vec<f64> = records.iter().map(|r| r.timestamp).collect();
        let outcome: Vec<u8> = records.iter().map(|r| r.kind.code()).collect();
        let x = axis(|s| s.x);
        let y = axis(|s| s.y);
        let z = axis(|s| s.z);
        let angle: Vec<f32> = records.iter().map(|r| r.angle.unwrap_or(f32::NAN)).collect();
        let face: Vec<u8> = records.iter().map(|r| r.face.index()).collect();
        let locked: Vec<u8> = records.iter().map(|r| r.locked as u8).collect();

        Self::append_to_dataset(&self.datasets.timestamps, new_size, &timestamps)?;
        Self::append_to_dataset(&self.datasets.outcome, new_size, &outcome)?;
        Self::append_to_dataset(&self.datasets.x, new_size, &x)?;
        Self::append_to_dataset(&self.datasets.y, new_size, &y)?;
        Self::append_to_dataset(&self.datasets.z, new_size, &z)?;
        Self::append_to_dataset(&self.datasets.angle, new_size, &angle)?;
        Self::append_to_dataset(&self.datasets.face, new_size, &face)?;
        Self::append_to_dataset(&self.datasets.locked, new_size, &locked)?;

        self.record_count = new_size;
        Ok(())
    }

    fn append_to_dataset<T: hdf5::H5Type>(dataset: &Dataset, new_size: usize, data: &[T]) -> Result<()> {
        dataset
            .resize((new_size,))
            .map_err(recording_error("Failed to resize dataset"))?;

        let start = new_size - data.len();
        dataset
            .write_slice(data, start..)
            .map_err(recording_error("Failed to write to dataset"))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush().map_err(recording_error("Failed to flush HDF5 file"))
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

/// Reads a recorded session
pub struct SessionReader {
    #[allow(dead_code)]
    file: File,
    datasets: DatasetHandles,
    metadata: SessionMetadata,
}

impl SessionReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(recording_error("Failed to open HDF5 file"))?;
        let metadata = Self::read_metadata(&file)?;
        let group = file
            .group("session")
            .map_err(recording_error("Failed to open session group"))?;
        let datasets = DatasetHandles::open(&group)?;

        Ok(Self {
            file,
            datasets,
            metadata,
        })
    }

    fn read_metadata(file: &File) -> Result<SessionMetadata> {
        let group = file
            .group("metadata")
            .map_err(recording_error("Failed to open metadata group"))?;

        let read_str = |name: &str| {
            group
                .attr(name)
                .and_then(|attr| attr.read_scalar::<hdf5::types::VarLenUnicode>())
                .map(|s| s.to_string())
                .map_err(|e| TrackerError::Recording(format!("Failed to read {}: {}", name, e)))
        };
        let read_u64 = |name: &str| {
            group
                .attr(name)
                .and_then(|attr| attr.read_scalar::<u64>())
                .map_err(|e| TrackerError::Recording(format!("Failed to read {}: {}", name, e)))
        };

        Ok(SessionMetadata {
            start_time: read_str("start_time")?,
            version: read_str("version")?,
            update_interval_ms: read_u64("update_interval_ms")?,
            calibration_threshold: read_u64("calibration_threshold")?,
            stream_capacity: read_u64("stream_capacity")?,
        })
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn total_records(&self) -> usize {
        self.datasets.timestamps.size()
    }

    /// Read a range of records; out-of-range requests are truncated
    pub fn read_range(&self, start: usize, count: usize) -> Result<Vec<SessionRecord>> {
        let total = self.total_records();
        if start >= total {
            return Ok(Vec::new());
        }
        let end = start + count.min(total - start);

        let read_f32 = |dataset: &Dataset, name: &str| -> Result<Vec<f32>> {
            dataset
                .read_slice_1d::<f32, _>(start..end)
                .map(|a| a.to_vec())
                .map_err(|e| TrackerError::Recording(format!("Failed to read {}: {}", name, e)))
        };
        let read_u8 = |dataset: &Dataset, name: &str| -> Result<Vec<u8>> {
            dataset
                .read_slice_1d::<u8, _>(start..end)
                .map(|a| a.to_vec())
                .map_err(|e| TrackerError::Recording(format!("Failed to read {}: {}", name, e)))
        };

        let timestamps: Vec<f64> = self
            .datasets
            .timestamps
            .read_slice_1d::<f64, _>(start..end)
            .map(|a| a.to_vec())
            .map_err(recording_error("Failed to read timestamps"))?;
        let outcome = read_u8(&self.datasets.outcome, "outcome")?;
        let x = read_f32(&self.datasets.x, "x")?;
        let y = read_f32(&self.datasets.y, "y")?;
        let z = read_f32(&self.datasets.z, "z")?;
        let angle = read_f32(&self.datasets.angle, "angle")?;
        let face = read_u8(&self.datasets.face, "face")?;
        let locked = read_u8(&self.datasets.locked, "locked")?;

        (0..timestamps.len())
            .map(|i| -> Result<SessionRecord> {
                let kind = RecordKind::from_code(outcome[i])?;
                Ok(SessionRecord {
                    timestamp: timestamps[i],
                    kind,
                    sample: (kind != RecordKind::Aborted).then(|| Sample::new(x[i], y[i], z[i])),
                    angle: (kind == RecordKind::Angle).then_some(angle[i]),
                    face: Face::from_index(face[i]),
                    locked: locked[i] != 0,
                })
            })
            .collect()
    }

    /// Turn the whole session back into a sample source
    pub fn to_replay(&self) -> Result<ReplaySource> {
        let records = self
            .read_range(0, self.total_records())?
            .into_iter()
            .map(|r| r.sample.ok_or_else(|| "recorded driver failure".to_string()))
            .collect();
        Ok(ReplaySource::from_records(records))
    }
}
