//! Tracker configuration
//!
//! Loaded from a JSON file so the smoothing window and calibration timing can
//! be tuned without recompiling. Command-line flags override file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::angle::WrapMode;
use crate::calibration::DEFAULT_CALIBRATION_THRESHOLD;
use crate::error::{Result, TrackerError};

/// Complete tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Samples kept per axis for median smoothing
    pub stream_capacity: usize,
    /// Ticks that must elapse before the reference can be captured
    pub calibration_threshold: u64,
    /// Accelerometer update period in milliseconds
    pub update_interval_ms: u64,
    /// Wrap correction applied to computed angles
    pub wrap: WrapMode,
    pub peak: PeakConfig,
}

/// Peak-angle reporting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Angles within +/- this many degrees are ignored
    pub dead_band_deg: f32,
    /// Minimum time between two published peaks
    pub publish_interval_ms: u64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            dead_band_deg: 5.0,
            publish_interval_ms: 2000,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stream_capacity: 10,
            calibration_threshold: DEFAULT_CALIBRATION_THRESHOLD,
            update_interval_ms: 200,
            wrap: WrapMode::OneSided,
            peak: PeakConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to defaults (with a warning) if the file is missing or
    /// cannot be parsed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load(&path) {
            Ok(config) => {
                tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                tracing::warn!(
                    "[Config] {} ({:?}). Using defaults.",
                    err,
                    path.as_ref()
                );
                Self::default()
            }
        }
    }

    /// Load configuration from a JSON file, reporting failures
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| TrackerError::Config(e.to_string()))
    }

    /// Write configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| TrackerError::Config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the tracker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stream_capacity == 0 {
            return Err(TrackerError::InvalidParameter(
                "stream_capacity must be at least 1".to_string(),
            ));
        }
        if self.update_interval_ms == 0 {
            return Err(TrackerError::InvalidParameter(
                "update_interval_ms must be at least 1".to_string(),
            ));
        }
        if !self.peak.dead_band_deg.is_finite() || self.peak.dead_band_deg < 0.0 {
            return Err(TrackerError::InvalidParameter(format!(
                "dead_band_deg must be a non-negative number, got {}",
                self.peak.dead_band_deg
            )));
        }
        Ok(())
    }

    /// Tick period for paced streaming
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Peak publish interval expressed in ticks (at least one)
    pub fn peak_interval_ticks(&self) -> u64 {
        (self.peak.publish_interval_ms / self.update_interval_ms.max(1)).max(1)
    }
}
