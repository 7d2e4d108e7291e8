//! Error types for the angle tracker

use thiserror::Error;

/// Error type for tracker, source and recording operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The accelerometer failed to deliver a sample for this tick
    #[error("Driver read failed: {0}")]
    DriverRead(String),

    /// The sample source has nothing more to deliver
    #[error("End of sample data")]
    EndOfData,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HDF5 session recording error
    #[cfg(feature = "recording")]
    #[error("Recording error: {0}")]
    Recording(String),
}

impl TrackerError {
    /// Whether the error only affects the current tick
    ///
    /// Transient errors abort a single tick; the run loop keeps going.
    pub fn is_transient(&self) -> bool {
        matches!(self, TrackerError::DriverRead(_))
    }
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
