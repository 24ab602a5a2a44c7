pub mod calibration;
pub mod filter;
pub mod threshold;
pub mod tracker;
pub mod types;

use thiserror::Error;

pub use calibration::{CalibrationSession, CalibrationStateMachine};
pub use filter::{GazeFilter, HeadFilter, SmoothingFilter};
pub use tracker::{AttentionTracker, FrameReport, WarningState};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
