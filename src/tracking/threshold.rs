//! Range checks for smoothed head angles and gaze vectors.
//!
//! Malformed ranges (min above max) are evaluated as-is and simply never match.

use super::types::{GazeVector, HeadAngles};

/// Every axis must satisfy `|angle - baseline| <= threshold`.
pub fn head_pose_within(angles: &HeadAngles, baseline: &HeadAngles, thresholds: &HeadAngles) -> bool {
    angles
        .iter()
        .zip(baseline)
        .zip(thresholds)
        .all(|((angle, base), limit)| (angle - base).abs() <= *limit)
}

/// Both components must lie inside their inclusive `[min, max]` range.
pub fn gaze_within(gaze: &GazeVector, horizontal_range: &[f64; 2], vertical_range: &[f64; 2]) -> bool {
    in_range(gaze[0], horizontal_range) && in_range(gaze[1], vertical_range)
}

fn in_range(value: f64, range: &[f64; 2]) -> bool {
    range[0] <= value && value <= range[1]
}
