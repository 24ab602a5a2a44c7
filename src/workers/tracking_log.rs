//! CSV log of smoothed head angles and gaze, one row per processed frame.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::tracking::types::{GazeVector, HeadAngles, SmoothedObservation};

pub const LOG_FILE_NAME: &str = "tracking_log.csv";
const HEADER: &str = "timestamp,yaw,pitch,roll,gaze_horizontal,gaze_vertical";

#[derive(Debug)]
pub struct TrackingLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TrackingLog {
    /// Create `<dir>/tracking_log.csv`, truncating any previous log.
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{HEADER}")?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "Tracking log opened");
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a row when both smoothed signals are present. Returns whether a row was written.
    pub fn record(&mut self, smoothed: &SmoothedObservation) -> io::Result<bool> {
        match (smoothed.head_angles, smoothed.gaze_vector) {
            (Some(angles), Some(gaze)) => {
                self.record_at(Utc::now(), &angles, &gaze)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn record_at(
        &mut self,
        at: DateTime<Utc>,
        angles: &HeadAngles,
        gaze: &GazeVector,
    ) -> io::Result<()> {
        let timestamp = at.timestamp_micros() as f64 / 1_000_000.0;
        writeln!(
            self.writer,
            "{timestamp:.6},{},{},{},{},{}",
            angles[0], angles[1], angles[2], gaze[0], gaze[1]
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for TrackingLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to flush tracking log");
        }
    }
}
