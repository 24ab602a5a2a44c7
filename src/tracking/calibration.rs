//! Guided calibration procedures.
//!
//! Two procedures share one session slot, so at most one runs at a time:
//! - head pose: average 60 frames of head angles into a new baseline
//! - gaze: 45 frames at each of 5 on-screen targets, widened by a fixed margin into ranges
//!
//! The machine only collects samples and reports what changed; applying the
//! update to the store and resetting filters is the tracker's job.

use super::types::{
    CalibrationEvent, CalibrationKind, CalibrationProgress, CalibrationUpdate, GazeVector,
    HeadAngles,
};

pub const HEAD_POSE_SAMPLE_COUNT: usize = 60;
pub const GAZE_SAMPLES_PER_STEP: usize = 45;
pub const GAZE_RANGE_MARGIN: f64 = 0.05;

const HEAD_POSE_START_INSTRUCTION: &str = "Hold your head in a neutral position";
const HEAD_POSE_PROGRESS_INSTRUCTION: &str = "Collecting head pose baseline...";
const HEAD_POSE_DONE: &str = "Head pose calibration completed.";
const GAZE_DONE: &str = "Gaze calibration completed.";
const CANCELLED: &str = "Calibration cancelled.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeStep {
    pub instruction: &'static str,
    pub key: &'static str,
    pub target: [f64; 2],
}

pub const GAZE_STEPS: [GazeStep; 5] = [
    GazeStep {
        instruction: "Focus on the centre of the screen",
        key: "center",
        target: [0.5, 0.5],
    },
    GazeStep {
        instruction: "Focus on the top-left corner",
        key: "top_left",
        target: [0.1, 0.1],
    },
    GazeStep {
        instruction: "Focus on the top-right corner",
        key: "top_right",
        target: [0.9, 0.1],
    },
    GazeStep {
        instruction: "Focus on the bottom-left corner",
        key: "bottom_left",
        target: [0.1, 0.9],
    },
    GazeStep {
        instruction: "Focus on the bottom-right corner",
        key: "bottom_right",
        target: [0.9, 0.9],
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CalibrationSession {
    #[default]
    Idle,
    HeadPoseCapture {
        samples: Vec<HeadAngles>,
    },
    GazeCapture {
        step_index: usize,
        samples_per_step: [Vec<GazeVector>; GAZE_STEPS.len()],
    },
}

#[derive(Debug, Default)]
pub struct CalibrationStateMachine {
    session: CalibrationSession,
}

impl CalibrationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.session, CalibrationSession::Idle)
    }

    pub fn active_kind(&self) -> Option<CalibrationKind> {
        match self.session {
            CalibrationSession::Idle => None,
            CalibrationSession::HeadPoseCapture { .. } => Some(CalibrationKind::HeadPose),
            CalibrationSession::GazeCapture { .. } => Some(CalibrationKind::Gaze),
        }
    }

    /// On-screen point for the current gaze step.
    pub fn current_target(&self) -> Option<[f64; 2]> {
        match &self.session {
            CalibrationSession::GazeCapture { step_index, .. } => {
                GAZE_STEPS.get(*step_index).map(|s| s.target)
            }
            _ => None,
        }
    }

    /// Begin head-pose capture. Any running procedure is abandoned along with its samples.
    pub fn start_head_pose(&mut self) -> CalibrationEvent {
        self.warn_if_replacing(CalibrationKind::HeadPose);
        self.session = CalibrationSession::HeadPoseCapture {
            samples: Vec::with_capacity(HEAD_POSE_SAMPLE_COUNT),
        };
        tracing::info!(target_samples = HEAD_POSE_SAMPLE_COUNT, "Head pose calibration started");
        progress(HEAD_POSE_START_INSTRUCTION, 0, HEAD_POSE_SAMPLE_COUNT, None)
    }

    /// Begin 5-point gaze capture. Any running procedure is abandoned along with its samples.
    pub fn start_gaze(&mut self) -> CalibrationEvent {
        self.warn_if_replacing(CalibrationKind::Gaze);
        self.session = CalibrationSession::GazeCapture {
            step_index: 0,
            samples_per_step: Default::default(),
        };
        tracing::info!(
            steps = GAZE_STEPS.len(),
            samples_per_step = GAZE_SAMPLES_PER_STEP,
            "Gaze calibration started"
        );
        let first = &GAZE_STEPS[0];
        progress(first.instruction, 0, GAZE_SAMPLES_PER_STEP, Some(first.target))
    }

    /// Drop all buffered samples without touching the calibration record.
    pub fn cancel(&mut self) -> CalibrationEvent {
        if let Some(kind) = self.active_kind() {
            tracing::info!(kind = kind.as_str(), "Calibration cancelled");
        }
        self.session = CalibrationSession::Idle;
        CalibrationEvent::Cancelled {
            message: CANCELLED.to_string(),
        }
    }

    /// Feed one frame's (smoothed) values into the active procedure.
    pub fn observe(
        &mut self,
        head_angles: Option<HeadAngles>,
        gaze_vector: Option<GazeVector>,
    ) -> Vec<CalibrationEvent> {
        match std::mem::take(&mut self.session) {
            CalibrationSession::Idle => Vec::new(),
            CalibrationSession::HeadPoseCapture { samples } => {
                self.observe_head_pose(samples, head_angles)
            }
            CalibrationSession::GazeCapture {
                step_index,
                samples_per_step,
            } => self.observe_gaze(step_index, samples_per_step, gaze_vector),
        }
    }

    fn observe_head_pose(
        &mut self,
        mut samples: Vec<HeadAngles>,
        head_angles: Option<HeadAngles>,
    ) -> Vec<CalibrationEvent> {
        let Some(angles) = head_angles else {
            self.session = CalibrationSession::HeadPoseCapture { samples };
            return Vec::new();
        };

        samples.push(angles);
        let collected = samples.len();
        let mut events = vec![progress(
            HEAD_POSE_PROGRESS_INSTRUCTION,
            collected.min(HEAD_POSE_SAMPLE_COUNT),
            HEAD_POSE_SAMPLE_COUNT,
            None,
        )];

        if collected < HEAD_POSE_SAMPLE_COUNT {
            self.session = CalibrationSession::HeadPoseCapture { samples };
            return events;
        }

        let baseline = mean_angles(&samples);
        tracing::info!(?baseline, samples = collected, "Head pose calibration completed");
        events.push(CalibrationEvent::Completed {
            kind: CalibrationKind::HeadPose,
            update: Some(CalibrationUpdate::HeadPoseBaseline { baseline }),
            message: HEAD_POSE_DONE.to_string(),
        });
        events
    }

    fn observe_gaze(
        &mut self,
        step_index: usize,
        mut samples_per_step: [Vec<GazeVector>; GAZE_STEPS.len()],
        gaze_vector: Option<GazeVector>,
    ) -> Vec<CalibrationEvent> {
        let Some(gaze) = gaze_vector else {
            self.session = CalibrationSession::GazeCapture {
                step_index,
                samples_per_step,
            };
            return Vec::new();
        };

        let step = GAZE_STEPS[step_index];
        let bucket = &mut samples_per_step[step_index];
        bucket.push(gaze);
        let collected = bucket.len();
        let mut events = vec![progress(
            step.instruction,
            collected.min(GAZE_SAMPLES_PER_STEP),
            GAZE_SAMPLES_PER_STEP,
            Some(step.target),
        )];

        if collected < GAZE_SAMPLES_PER_STEP {
            self.session = CalibrationSession::GazeCapture {
                step_index,
                samples_per_step,
            };
            return events;
        }

        let next_index = step_index + 1;
        if let Some(next) = GAZE_STEPS.get(next_index) {
            tracing::debug!(step = step.key, next = next.key, "Gaze calibration step done");
            events.push(progress(
                next.instruction,
                0,
                GAZE_SAMPLES_PER_STEP,
                Some(next.target),
            ));
            self.session = CalibrationSession::GazeCapture {
                step_index: next_index,
                samples_per_step,
            };
            return events;
        }

        let update = gaze_ranges_from_samples(samples_per_step.iter().flatten());
        match &update {
            Some(u) => tracing::info!(?u, "Gaze calibration completed"),
            None => tracing::warn!("Gaze calibration finished without samples; ranges unchanged"),
        }
        events.push(CalibrationEvent::Completed {
            kind: CalibrationKind::Gaze,
            update,
            message: GAZE_DONE.to_string(),
        });
        events
    }

    fn warn_if_replacing(&self, starting: CalibrationKind) {
        if let Some(active) = self.active_kind() {
            tracing::warn!(
                active = active.as_str(),
                starting = starting.as_str(),
                "Calibration restarted; buffered samples discarded"
            );
        }
    }
}

/// Global min/max of each gaze component, widened by [`GAZE_RANGE_MARGIN`].
///
/// Returns `None` for an empty sample pool.
pub fn gaze_ranges_from_samples<'a, I>(samples: I) -> Option<CalibrationUpdate>
where
    I: IntoIterator<Item = &'a GazeVector>,
{
    let mut bounds: Option<([f64; 2], [f64; 2])> = None;
    for [h, v] in samples.into_iter().copied() {
        let (horizontal, vertical) = bounds.get_or_insert(([h, h], [v, v]));
        horizontal[0] = horizontal[0].min(h);
        horizontal[1] = horizontal[1].max(h);
        vertical[0] = vertical[0].min(v);
        vertical[1] = vertical[1].max(v);
    }
    bounds.map(|(horizontal, vertical)| CalibrationUpdate::GazeRanges {
        horizontal_range: [horizontal[0] - GAZE_RANGE_MARGIN, horizontal[1] + GAZE_RANGE_MARGIN],
        vertical_range: [vertical[0] - GAZE_RANGE_MARGIN, vertical[1] + GAZE_RANGE_MARGIN],
    })
}

fn mean_angles(samples: &[HeadAngles]) -> HeadAngles {
    let mut sum = [0.0; 3];
    for sample in samples {
        for (acc, v) in sum.iter_mut().zip(sample) {
            *acc += v;
        }
    }
    let count = samples.len().max(1) as f64;
    sum.map(|v| v / count)
}

fn progress(
    instruction: &str,
    collected: usize,
    target: usize,
    target_point: Option<[f64; 2]>,
) -> CalibrationEvent {
    CalibrationEvent::Progress(CalibrationProgress {
        instruction: instruction.to_string(),
        collected,
        target,
        target_point,
    })
}
