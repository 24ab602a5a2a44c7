pub mod schema;

use std::fs::{self, File};
use std::fmt::Debug;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use thiserror::Error;

use crate::tracking::types::{CalibrationUpdate, HeadAngles};
use crate::validation;
use schema::{CalibrationRecord, PersistedState, Settings, SettingsUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

impl StoreError {
    fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }
}

/// Owner of the settings and calibration record.
///
/// Readers get whole-record snapshots under one lock, so a baseline and its
/// thresholds are never observed half-updated. Every mutation is validated,
/// applied in memory, then written to disk as temp file + rename.
#[derive(Debug)]
pub struct CalibrationStore {
    path: PathBuf,
    state: RwLock<PersistedState>,
}

impl CalibrationStore {
    /// Load the record at `path`. Anything missing or unreadable falls back to defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load(&path);
        tracing::info!(path = %path.display(), "Calibration store loaded");
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> PersistedState {
        self.read().clone()
    }

    pub fn settings(&self) -> Settings {
        self.read().settings.clone()
    }

    pub fn calibration(&self) -> CalibrationRecord {
        self.read().calibration
    }

    /// Write the current state to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let guard = self.write();
        persist(&self.path, &guard)
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings, StoreError> {
        validation::validate_settings_update(update).map_err(StoreError::validation)?;
        let state = self.mutate(|state| update.apply_to(&mut state.settings))?;
        tracing::info!(?update, "Settings updated");
        Ok(state.settings)
    }

    pub fn update_head_pose_baseline(&self, baseline: HeadAngles) -> Result<(), StoreError> {
        validation::validate_head_pose_baseline(&baseline).map_err(StoreError::validation)?;
        self.mutate(|state| state.calibration.head_pose.baseline = baseline)?;
        Ok(())
    }

    pub fn update_head_pose_thresholds(&self, thresholds: HeadAngles) -> Result<(), StoreError> {
        validation::validate_head_pose_thresholds(&thresholds).map_err(StoreError::validation)?;
        self.mutate(|state| state.calibration.head_pose.thresholds = thresholds)?;
        tracing::info!(?thresholds, "Head pose thresholds updated");
        Ok(())
    }

    pub fn update_gaze_ranges(
        &self,
        horizontal_range: [f64; 2],
        vertical_range: [f64; 2],
    ) -> Result<(), StoreError> {
        validation::validate_gaze_ranges(&horizontal_range, &vertical_range)
            .map_err(StoreError::validation)?;
        self.mutate(|state| {
            state.calibration.gaze.horizontal_range = horizontal_range;
            state.calibration.gaze.vertical_range = vertical_range;
        })?;
        tracing::info!(?horizontal_range, ?vertical_range, "Gaze ranges updated");
        Ok(())
    }

    pub fn apply(&self, update: CalibrationUpdate) -> Result<(), StoreError> {
        match update {
            CalibrationUpdate::HeadPoseBaseline { baseline } => {
                self.update_head_pose_baseline(baseline)
            }
            CalibrationUpdate::GazeRanges {
                horizontal_range,
                vertical_range,
            } => self.update_gaze_ranges(horizontal_range, vertical_range),
        }
    }

    /// Restore the default calibration record. Settings are kept.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.mutate(|state| state.calibration = CalibrationRecord::default())?;
        tracing::info!("Calibration reset to defaults");
        Ok(())
    }

    /// The lock is held across the write so concurrent updates reach disk in order.
    /// The write is synchronous; the record is a few hundred bytes.
    fn mutate<F>(&self, f: F) -> Result<PersistedState, StoreError>
    where
        F: FnOnce(&mut PersistedState),
    {
        let mut guard = self.write();
        f(&mut *guard);
        let snapshot = guard.clone();
        if let Err(e) = persist(&self.path, &snapshot) {
            tracing::error!(error = %e, path = %self.path.display(), "Failed to persist calibration store");
            return Err(e);
        }
        Ok(snapshot)
    }

    fn read(&self) -> RwLockReadGuard<'_, PersistedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PersistedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(path: &Path) -> PersistedState {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedState::default(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Cannot read config, using defaults");
            return PersistedState::default();
        }
    };

    let root = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Config root is not an object, using defaults");
            return PersistedState::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Malformed config, using defaults");
            return PersistedState::default();
        }
    };

    let settings = sanitize_settings(section::<Settings>(&root, "settings"));
    let mut calibration = section::<CalibrationRecord>(&root, "calibration");

    if let Err(msg) = validation::validate_head_pose_baseline(&calibration.head_pose.baseline)
        .and_then(|_| validation::validate_head_pose_thresholds(&calibration.head_pose.thresholds))
    {
        tracing::warn!(error = msg, "Stored head pose calibration rejected, using defaults");
        calibration.head_pose = Default::default();
    }
    if let Err(msg) = validation::validate_gaze_ranges(
        &calibration.gaze.horizontal_range,
        &calibration.gaze.vertical_range,
    ) {
        tracing::warn!(error = msg, "Stored gaze calibration rejected, using defaults");
        calibration.gaze = Default::default();
    }

    PersistedState {
        settings,
        calibration,
    }
}

/// Replace every out-of-range stored option with its default.
fn sanitize_settings(mut settings: Settings) -> Settings {
    let defaults = Settings::default();
    clamp_field("camera_index", &mut settings.camera_index, &validation::CAMERA_INDEX_RANGE, defaults.camera_index);
    clamp_field("frame_width", &mut settings.frame_width, &validation::FRAME_WIDTH_RANGE, defaults.frame_width);
    clamp_field("frame_height", &mut settings.frame_height, &validation::FRAME_HEIGHT_RANGE, defaults.frame_height);
    clamp_field(
        "smoothing_window",
        &mut settings.smoothing_window,
        &validation::SMOOTHING_WINDOW_RANGE,
        defaults.smoothing_window,
    );
    clamp_field(
        "warning_delay_frames",
        &mut settings.warning_delay_frames,
        &validation::WARNING_DELAY_RANGE,
        defaults.warning_delay_frames,
    );
    clamp_field("overlay_width", &mut settings.overlay_width, &validation::OVERLAY_WIDTH_RANGE, defaults.overlay_width);
    clamp_field("overlay_height", &mut settings.overlay_height, &validation::OVERLAY_HEIGHT_RANGE, defaults.overlay_height);
    clamp_field("overlay_pos_x", &mut settings.overlay_pos_x, &validation::OVERLAY_POS_RANGE, defaults.overlay_pos_x);
    clamp_field("overlay_pos_y", &mut settings.overlay_pos_y, &validation::OVERLAY_POS_RANGE, defaults.overlay_pos_y);
    settings
}

fn clamp_field<T>(field: &'static str, value: &mut T, range: &RangeInclusive<T>, default: T)
where
    T: PartialOrd + Debug,
{
    if !range.contains(value) {
        tracing::warn!(field, stored = ?value, default = ?default, "Stored setting out of range, using default");
        *value = default;
    }
}

fn section<T>(root: &Value, key: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match root.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, section = key, "Malformed config section, using defaults");
            T::default()
        }),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn persist(path: &Path, state: &PersistedState) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(state)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
