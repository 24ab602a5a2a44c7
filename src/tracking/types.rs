use serde::{Deserialize, Serialize};

/// Yaw, pitch, roll in degrees.
pub type HeadAngles = [f64; 3];

/// Normalised horizontal / vertical iris deviation.
pub type GazeVector = [f64; 2];

/// Pixel position in the source frame.
pub type PixelPoint = [f64; 2];

/// One frame's output from the face detector and pose solver.
///
/// Every field absent means no face was found in the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObservation {
    pub head_angles: Option<HeadAngles>,
    pub gaze_vector: Option<GazeVector>,
    pub iris_positions: Option<[PixelPoint; 2]>,
    pub landmarks: Option<Vec<PixelPoint>>,
}

impl RawObservation {
    pub fn no_face() -> Self {
        Self::default()
    }

    pub fn with_angles(head_angles: HeadAngles) -> Self {
        Self {
            head_angles: Some(head_angles),
            ..Self::default()
        }
    }

    pub fn with_gaze(gaze_vector: GazeVector) -> Self {
        Self {
            gaze_vector: Some(gaze_vector),
            ..Self::default()
        }
    }

    pub fn face(head_angles: HeadAngles, gaze_vector: GazeVector) -> Self {
        Self {
            head_angles: Some(head_angles),
            gaze_vector: Some(gaze_vector),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head_angles.is_none()
            && self.gaze_vector.is_none()
            && self.iris_positions.is_none()
            && self.landmarks.is_none()
    }
}

/// Filtered angle and gaze values; a field stays `None` until its filter has seen a sample this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedObservation {
    pub head_angles: Option<HeadAngles>,
    pub gaze_vector: Option<GazeVector>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingVerdict {
    pub head_pose_within: bool,
    pub gaze_within: bool,
    pub attention_ok: bool,
}

impl TrackingVerdict {
    pub fn new(head_pose_within: bool, gaze_within: bool) -> Self {
        Self {
            head_pose_within,
            gaze_within,
            attention_ok: head_pose_within && gaze_within,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    HeadPose,
    Gaze,
}

impl CalibrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeadPose => "head_pose",
            Self::Gaze => "gaze",
        }
    }
}

/// Record change produced when a calibration procedure finishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationUpdate {
    HeadPoseBaseline {
        baseline: HeadAngles,
    },
    GazeRanges {
        horizontal_range: [f64; 2],
        vertical_range: [f64; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub instruction: String,
    pub collected: usize,
    pub target: usize,
    /// Normalised on-screen point the user should look at (gaze capture only).
    pub target_point: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    Progress(CalibrationProgress),
    Completed {
        kind: CalibrationKind,
        update: Option<CalibrationUpdate>,
        message: String,
    },
    Cancelled {
        message: String,
    },
}

/// Per-frame status published to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub verdict: TrackingVerdict,
    pub head_angles: Option<HeadAngles>,
    pub gaze_vector: Option<GazeVector>,
    pub iris_positions: Option<[PixelPoint; 2]>,
    pub landmark_count: usize,
    pub calibration_target: Option<[f64; 2]>,
    pub calibrating: bool,
    pub consecutive_failures: u32,
    pub warning_active: bool,
    pub warning_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    Status(StatusPayload),
    CalibrationStep {
        instruction: String,
        collected: usize,
        target: usize,
    },
    CalibrationFinished {
        message: String,
    },
    WarningStateChanged {
        active: bool,
        message: String,
    },
    Error {
        message: String,
    },
}

impl TrackerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::CalibrationStep { .. } => "calibration_step",
            Self::CalibrationFinished { .. } => "calibration_finished",
            Self::WarningStateChanged { .. } => "warning_state_changed",
            Self::Error { .. } => "error",
        }
    }
}

impl From<CalibrationEvent> for TrackerEvent {
    fn from(event: CalibrationEvent) -> Self {
        match event {
            CalibrationEvent::Progress(p) => Self::CalibrationStep {
                instruction: p.instruction,
                collected: p.collected,
                target: p.target,
            },
            CalibrationEvent::Completed { message, .. } | CalibrationEvent::Cancelled { message } => {
                Self::CalibrationFinished { message }
            }
        }
    }
}
