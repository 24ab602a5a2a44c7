//! Shared input checks for settings and calibration edits.
//! Used by the calibration store before anything is applied or persisted.

use std::ops::RangeInclusive;

use crate::store::schema::SettingsUpdate;

pub const CAMERA_INDEX_RANGE: RangeInclusive<u32> = 0..=10;
pub const FRAME_WIDTH_RANGE: RangeInclusive<u32> = 1..=7680;
pub const FRAME_HEIGHT_RANGE: RangeInclusive<u32> = 1..=4320;
pub const SMOOTHING_WINDOW_RANGE: RangeInclusive<usize> = 1..=120;
pub const WARNING_DELAY_RANGE: RangeInclusive<u32> = 1..=120;
pub const OVERLAY_WIDTH_RANGE: RangeInclusive<u32> = 160..=800;
pub const OVERLAY_HEIGHT_RANGE: RangeInclusive<u32> = 80..=400;
pub const OVERLAY_POS_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Check every present field; nothing is applied when any of them fails.
pub fn validate_settings_update(update: &SettingsUpdate) -> Result<(), &'static str> {
    if let Some(v) = update.camera_index {
        if !CAMERA_INDEX_RANGE.contains(&v) {
            return Err("camera_index must be in [0,10]");
        }
    }
    if let Some(v) = update.frame_width {
        if !FRAME_WIDTH_RANGE.contains(&v) {
            return Err("frame_width must be in [1,7680]");
        }
    }
    if let Some(v) = update.frame_height {
        if !FRAME_HEIGHT_RANGE.contains(&v) {
            return Err("frame_height must be in [1,4320]");
        }
    }
    if let Some(v) = update.smoothing_window {
        if !SMOOTHING_WINDOW_RANGE.contains(&v) {
            return Err("smoothing_window must be in [1,120]");
        }
    }
    if let Some(v) = update.warning_delay_frames {
        if !WARNING_DELAY_RANGE.contains(&v) {
            return Err("warning_delay_frames must be in [1,120]");
        }
    }
    if let Some(v) = update.overlay_width {
        if !OVERLAY_WIDTH_RANGE.contains(&v) {
            return Err("overlay_width must be in [160,800]");
        }
    }
    if let Some(v) = update.overlay_height {
        if !OVERLAY_HEIGHT_RANGE.contains(&v) {
            return Err("overlay_height must be in [80,400]");
        }
    }
    // NaN fails `contains`, so it is rejected here as well.
    if let Some(v) = update.overlay_pos_x {
        if !OVERLAY_POS_RANGE.contains(&v) {
            return Err("overlay_pos_x must be in [0,100]");
        }
    }
    if let Some(v) = update.overlay_pos_y {
        if !OVERLAY_POS_RANGE.contains(&v) {
            return Err("overlay_pos_y must be in [0,100]");
        }
    }
    Ok(())
}

/// Thresholds must be finite and non-negative on every axis.
pub fn validate_head_pose_thresholds(thresholds: &[f64; 3]) -> Result<(), &'static str> {
    if thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
        return Err("head pose thresholds must be finite and non-negative");
    }
    Ok(())
}

pub fn validate_head_pose_baseline(baseline: &[f64; 3]) -> Result<(), &'static str> {
    if baseline.iter().any(|v| !v.is_finite()) {
        return Err("head pose baseline must be finite");
    }
    Ok(())
}

/// Each range must be finite with `min <= max`; an inverted range would never match.
pub fn validate_gaze_ranges(
    horizontal_range: &[f64; 2],
    vertical_range: &[f64; 2],
) -> Result<(), &'static str> {
    for range in [horizontal_range, vertical_range] {
        if !range[0].is_finite() || !range[1].is_finite() {
            return Err("gaze ranges must be finite");
        }
        if range[0] > range[1] {
            return Err("gaze range min must not exceed max");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_valid() {
        assert!(validate_settings_update(&SettingsUpdate::default()).is_ok());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let cases = [
            SettingsUpdate {
                smoothing_window: Some(0),
                ..Default::default()
            },
            SettingsUpdate {
                warning_delay_frames: Some(121),
                ..Default::default()
            },
            SettingsUpdate {
                camera_index: Some(11),
                ..Default::default()
            },
            SettingsUpdate {
                overlay_width: Some(100),
                ..Default::default()
            },
            SettingsUpdate {
                overlay_pos_y: Some(f64::NAN),
                ..Default::default()
            },
        ];
        for update in cases {
            assert!(validate_settings_update(&update).is_err(), "{update:?}");
        }
    }

    #[test]
    fn boundary_values_pass() {
        let update = SettingsUpdate {
            smoothing_window: Some(1),
            warning_delay_frames: Some(120),
            overlay_width: Some(800),
            overlay_height: Some(80),
            overlay_pos_x: Some(0.0),
            overlay_pos_y: Some(100.0),
            ..Default::default()
        };
        assert!(validate_settings_update(&update).is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(validate_head_pose_thresholds(&[15.0, -1.0, 15.0]).is_err());
        assert!(validate_head_pose_thresholds(&[0.0, 0.0, 0.0]).is_ok());
    }

    #[test]
    fn inverted_gaze_range_is_rejected() {
        assert!(validate_gaze_ranges(&[0.3, -0.3], &[-0.3, 0.3]).is_err());
        assert!(validate_gaze_ranges(&[-0.3, 0.3], &[0.2, 0.2]).is_ok());
        assert!(validate_gaze_ranges(&[f64::NEG_INFINITY, 0.3], &[-0.3, 0.3]).is_err());
    }
}
