use serde::{Deserialize, Serialize};

use crate::tracking::threshold;
use crate::tracking::types::{GazeVector, HeadAngles};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseCalibration {
    /// Neutral yaw, pitch, roll in degrees.
    pub baseline: HeadAngles,
    /// Allowed deviation per axis in degrees.
    pub thresholds: HeadAngles,
}

impl Default for HeadPoseCalibration {
    fn default() -> Self {
        Self {
            baseline: [0.0, 0.0, 0.0],
            thresholds: [15.0, 15.0, 15.0],
        }
    }
}

impl HeadPoseCalibration {
    pub fn within_threshold(&self, angles: &HeadAngles) -> bool {
        threshold::head_pose_within(angles, &self.baseline, &self.thresholds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeCalibration {
    pub horizontal_range: [f64; 2],
    pub vertical_range: [f64; 2],
}

impl Default for GazeCalibration {
    fn default() -> Self {
        Self {
            horizontal_range: [-0.3, 0.3],
            vertical_range: [-0.3, 0.3],
        }
    }
}

impl GazeCalibration {
    pub fn within_threshold(&self, gaze: &GazeVector) -> bool {
        threshold::gaze_within(gaze, &self.horizontal_range, &self.vertical_range)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRecord {
    pub head_pose: HeadPoseCalibration,
    pub gaze: GazeCalibration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub smoothing_window: usize,
    pub warning_delay_frames: u32,
    pub overlay_enabled: bool,
    pub log_to_csv: bool,
    pub overlay_width: u32,
    pub overlay_height: u32,
    /// Percent of the available screen width.
    pub overlay_pos_x: f64,
    /// Percent of the available screen height.
    pub overlay_pos_y: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            smoothing_window: 5,
            warning_delay_frames: 10,
            overlay_enabled: true,
            log_to_csv: false,
            overlay_width: 360,
            overlay_height: 140,
            overlay_pos_x: 50.0,
            overlay_pos_y: 12.0,
        }
    }
}

/// Partial settings change. Only the recognised options exist; anything else fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothing_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_delay_frames: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_to_csv: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_pos_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_pos_y: Option<f64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy every present field onto `settings`. Callers validate first.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(v) = self.camera_index {
            settings.camera_index = v;
        }
        if let Some(v) = self.frame_width {
            settings.frame_width = v;
        }
        if let Some(v) = self.frame_height {
            settings.frame_height = v;
        }
        if let Some(v) = self.smoothing_window {
            settings.smoothing_window = v;
        }
        if let Some(v) = self.warning_delay_frames {
            settings.warning_delay_frames = v;
        }
        if let Some(v) = self.overlay_enabled {
            settings.overlay_enabled = v;
        }
        if let Some(v) = self.log_to_csv {
            settings.log_to_csv = v;
        }
        if let Some(v) = self.overlay_width {
            settings.overlay_width = v;
        }
        if let Some(v) = self.overlay_height {
            settings.overlay_height = v;
        }
        if let Some(v) = self.overlay_pos_x {
            settings.overlay_pos_x = v;
        }
        if let Some(v) = self.overlay_pos_y {
            settings.overlay_pos_y = v;
        }
    }

    /// True when the capture device has to be reopened.
    pub fn touches_capture(&self) -> bool {
        self.camera_index.is_some() || self.frame_width.is_some() || self.frame_height.is_some()
    }
}

/// The durable record: `{"settings": {...}, "calibration": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub settings: Settings,
    pub calibration: CalibrationRecord,
}
