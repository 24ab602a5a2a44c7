use std::sync::Arc;

use crate::store::CalibrationStore;

use super::calibration::CalibrationStateMachine;
use super::filter::{GazeFilter, HeadFilter};
use super::types::{
    CalibrationEvent, CalibrationKind, RawObservation, SmoothedObservation, StatusPayload,
    TrackerEvent, TrackingVerdict,
};
use super::TrackingError;

pub const WARNING_MESSAGE: &str = "Please look at the screen.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningState {
    pub active: bool,
    /// Empty while inactive.
    pub message: String,
}

impl WarningState {
    fn new(active: bool) -> Self {
        Self {
            active,
            message: if active {
                WARNING_MESSAGE.to_string()
            } else {
                String::new()
            },
        }
    }
}

/// Everything one processed frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub verdict: TrackingVerdict,
    pub smoothed: SmoothedObservation,
    pub calibration_events: Vec<CalibrationEvent>,
    pub calibration_target: Option<[f64; 2]>,
    pub calibrating: bool,
    pub consecutive_failures: u32,
    pub warning: WarningState,
    pub warning_changed: bool,
}

impl FrameReport {
    pub fn status(&self, raw: &RawObservation) -> StatusPayload {
        StatusPayload {
            verdict: self.verdict,
            head_angles: self.smoothed.head_angles,
            gaze_vector: self.smoothed.gaze_vector,
            iris_positions: raw.iris_positions,
            landmark_count: raw.landmarks.as_ref().map_or(0, Vec::len),
            calibration_target: self.calibration_target,
            calibrating: self.calibrating,
            consecutive_failures: self.consecutive_failures,
            warning_active: self.warning.active,
            warning_message: self.warning.message.clone(),
        }
    }

    /// Events in publish order: calibration progress, warning transition, then status.
    pub fn into_events(self, raw: &RawObservation) -> Vec<TrackerEvent> {
        let status = self.status(raw);
        let mut events: Vec<TrackerEvent> = self
            .calibration_events
            .into_iter()
            .map(TrackerEvent::from)
            .collect();
        if self.warning_changed {
            events.push(TrackerEvent::WarningStateChanged {
                active: self.warning.active,
                message: self.warning.message,
            });
        }
        events.push(TrackerEvent::Status(status));
        events
    }
}

/// Per-frame pipeline: smoothing, threshold checks, calibration routing and
/// the consecutive-failure warning.
///
/// Lives on the capture task. Calibration and settings are read from the
/// store once per frame as a whole snapshot.
#[derive(Debug)]
pub struct AttentionTracker {
    store: Arc<CalibrationStore>,
    head_filter: HeadFilter,
    gaze_filter: GazeFilter,
    calibration: CalibrationStateMachine,
    consecutive_failures: u32,
    warning_active: bool,
}

impl AttentionTracker {
    pub fn new(store: Arc<CalibrationStore>) -> Result<Self, TrackingError> {
        let window = store.settings().smoothing_window;
        Ok(Self {
            store,
            head_filter: HeadFilter::new(window)?,
            gaze_filter: GazeFilter::new(window)?,
            calibration: CalibrationStateMachine::new(),
            consecutive_failures: 0,
            warning_active: false,
        })
    }

    pub fn store(&self) -> &Arc<CalibrationStore> {
        &self.store
    }

    pub fn calibration(&self) -> &CalibrationStateMachine {
        &self.calibration
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_active()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn warning_active(&self) -> bool {
        self.warning_active
    }

    pub fn smoothing_window(&self) -> usize {
        self.head_filter.window_size()
    }

    /// Swap in fresh filters of the new size. Buffered samples are dropped.
    pub fn set_smoothing_window(&mut self, window_size: usize) -> Result<(), TrackingError> {
        let head_filter = HeadFilter::new(window_size)?;
        let gaze_filter = GazeFilter::new(window_size)?;
        self.head_filter = head_filter;
        self.gaze_filter = gaze_filter;
        tracing::info!(window_size, "Smoothing filters rebuilt");
        Ok(())
    }

    pub fn start_head_pose_calibration(&mut self) -> CalibrationEvent {
        self.calibration.start_head_pose()
    }

    pub fn start_gaze_calibration(&mut self) -> CalibrationEvent {
        self.calibration.start_gaze()
    }

    pub fn cancel_calibration(&mut self) -> CalibrationEvent {
        self.calibration.cancel()
    }

    pub fn process(&mut self, raw: &RawObservation) -> FrameReport {
        let snapshot = self.store.snapshot();
        let record = snapshot.calibration;

        let smoothed = SmoothedObservation {
            head_angles: raw.head_angles.map(|a| self.head_filter.add(a)),
            gaze_vector: raw.gaze_vector.map(|g| self.gaze_filter.add(g)),
        };

        // A missing signal fails its check.
        let head_pose_within = smoothed
            .head_angles
            .is_some_and(|a| record.head_pose.within_threshold(&a));
        let gaze_within = smoothed
            .gaze_vector
            .is_some_and(|g| record.gaze.within_threshold(&g));
        let verdict = TrackingVerdict::new(head_pose_within, gaze_within);

        self.consecutive_failures = if verdict.attention_ok {
            0
        } else {
            self.consecutive_failures.saturating_add(1)
        };

        let was_calibrating = self.calibration.is_active();
        let calibration_events = if was_calibrating {
            let events = self
                .calibration
                .observe(smoothed.head_angles, smoothed.gaze_vector);
            self.apply_completions(&events);
            events
        } else {
            Vec::new()
        };

        let active = !was_calibrating
            && self.consecutive_failures >= snapshot.settings.warning_delay_frames;
        let warning_changed = active != self.warning_active;
        if warning_changed {
            tracing::info!(
                active,
                consecutive_failures = self.consecutive_failures,
                "Attention warning changed"
            );
        }
        self.warning_active = active;

        FrameReport {
            verdict,
            smoothed,
            calibration_events,
            calibration_target: self.calibration.current_target(),
            calibrating: self.calibration.is_active(),
            consecutive_failures: self.consecutive_failures,
            warning: WarningState::new(active),
            warning_changed,
        }
    }

    fn apply_completions(&mut self, events: &[CalibrationEvent]) {
        for event in events {
            let CalibrationEvent::Completed { kind, update, .. } = event else {
                continue;
            };
            match kind {
                CalibrationKind::HeadPose => self.head_filter.reset(),
                CalibrationKind::Gaze => self.gaze_filter.reset(),
            }
            if let Some(update) = update {
                if let Err(e) = self.store.apply(*update) {
                    tracing::error!(error = %e, kind = kind.as_str(), "Failed to store calibration result");
                }
            }
        }
    }
}
