//! The producer loop: pull observations from the source, run them through the
//! tracker and broadcast what happened.
//!
//! All tracker and calibration state lives on this task. Everything else talks
//! to it through [`TrackerHandle`]: commands in over `mpsc`, events out over
//! `broadcast`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::CaptureConfig;
use crate::source::{ObservationSource, SourceError};
use crate::store::schema::{Settings, SettingsUpdate};
use crate::store::{CalibrationStore, StoreError};
use crate::tracking::types::{RawObservation, TrackerEvent};
use crate::tracking::{AttentionTracker, TrackingError};

use super::tracking_log::TrackingLog;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture worker is not running")]
    Closed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub enum TrackerCommand {
    StartHeadPoseCalibration,
    StartGazeCalibration,
    CancelCalibration,
    UpdateSettings {
        update: SettingsUpdate,
        reply: Reply<Settings>,
    },
    SetHeadPoseThresholds {
        thresholds: [f64; 3],
        reply: Reply<()>,
    },
    SetGazeRanges {
        horizontal_range: [f64; 2],
        vertical_range: [f64; 2],
        reply: Reply<()>,
    },
    ResetCalibration {
        reply: Reply<()>,
    },
}

/// Cloneable front door to the capture task.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    events: broadcast::Sender<TrackerEvent>,
}

impl TrackerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub async fn send(&self, command: TrackerCommand) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CaptureError::Closed)
    }

    pub async fn start_head_pose_calibration(&self) -> Result<(), CaptureError> {
        self.send(TrackerCommand::StartHeadPoseCalibration).await
    }

    pub async fn start_gaze_calibration(&self) -> Result<(), CaptureError> {
        self.send(TrackerCommand::StartGazeCalibration).await
    }

    pub async fn cancel_calibration(&self) -> Result<(), CaptureError> {
        self.send(TrackerCommand::CancelCalibration).await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, CaptureError> {
        self.request(|reply| TrackerCommand::UpdateSettings { update, reply })
            .await
    }

    pub async fn set_head_pose_thresholds(&self, thresholds: [f64; 3]) -> Result<(), CaptureError> {
        self.request(|reply| TrackerCommand::SetHeadPoseThresholds { thresholds, reply })
            .await
    }

    pub async fn set_gaze_ranges(
        &self,
        horizontal_range: [f64; 2],
        vertical_range: [f64; 2],
    ) -> Result<(), CaptureError> {
        self.request(|reply| TrackerCommand::SetGazeRanges {
            horizontal_range,
            vertical_range,
            reply,
        })
        .await
    }

    pub async fn reset_calibration(&self) -> Result<(), CaptureError> {
        self.request(|reply| TrackerCommand::ResetCalibration { reply })
            .await
    }

    async fn request<T, F>(&self, build: F) -> Result<T, CaptureError>
    where
        F: FnOnce(Reply<T>) -> TrackerCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        let result = rx.await.map_err(|_| CaptureError::Closed)?;
        Ok(result?)
    }
}

pub struct CaptureWorker<S> {
    tracker: AttentionTracker,
    source: S,
    config: CaptureConfig,
    commands: mpsc::Receiver<TrackerCommand>,
    events: broadcast::Sender<TrackerEvent>,
    shutdown_rx: broadcast::Receiver<()>,
    csv: Option<TrackingLog>,
}

impl<S: ObservationSource> CaptureWorker<S> {
    pub fn new(
        store: Arc<CalibrationStore>,
        source: S,
        config: &CaptureConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(Self, TrackerHandle), TrackingError> {
        let tracker = AttentionTracker::new(store)?;
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity.max(1));
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let handle = TrackerHandle {
            commands: command_tx,
            events: event_tx.clone(),
        };
        let worker = Self {
            tracker,
            source,
            config: config.clone(),
            commands: command_rx,
            events: event_tx,
            shutdown_rx,
            csv: None,
        };
        Ok((worker, handle))
    }

    pub async fn run(mut self) {
        tracing::info!(
            frame_interval_ms = self.config.frame_interval.as_millis() as u64,
            "Capture worker started"
        );
        if self.tracker.store().settings().log_to_csv {
            self.open_csv();
        }

        loop {
            self.drain_commands();

            if !self.source.is_open() {
                let settings = self.tracker.store().settings();
                if let Err(e) = self.source.open(&settings) {
                    tracing::warn!(
                        error = %e,
                        retry_ms = self.config.source_retry.as_millis() as u64,
                        "Observation source unavailable, retrying"
                    );
                    self.publish(TrackerEvent::Error {
                        message: format!("Observation source unavailable: {e}"),
                    });
                    if self.pause(self.config.source_retry).await {
                        break;
                    }
                    continue;
                }
            }

            match self.source.read() {
                Ok(Some(raw)) => self.process_frame(&raw),
                Ok(None) => {}
                Err(e @ SourceError::Decode { .. }) => {
                    tracing::warn!(error = %e, "Skipping undecodable observation");
                    self.publish(TrackerEvent::Error {
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read observation");
                    self.publish(TrackerEvent::Error {
                        message: format!("Failed to read frame: {e}"),
                    });
                    if self.pause(self.config.read_retry).await {
                        break;
                    }
                    continue;
                }
            }

            if self.pause(self.config.frame_interval).await {
                break;
            }
        }

        self.stop();
    }

    fn process_frame(&mut self, raw: &RawObservation) {
        let report = self.tracker.process(raw);

        if let Some(csv) = self.csv.as_mut() {
            if let Err(e) = csv.record(&report.smoothed) {
                tracing::error!(error = %e, "Tracking log write failed, disabling");
                self.csv = None;
                self.publish(TrackerEvent::Error {
                    message: format!("Tracking log disabled: {e}"),
                });
            }
        }

        for event in report.into_events(raw) {
            self.publish(event);
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: TrackerCommand) {
        match command {
            TrackerCommand::StartHeadPoseCalibration => {
                let event = self.tracker.start_head_pose_calibration();
                self.publish(event.into());
            }
            TrackerCommand::StartGazeCalibration => {
                let event = self.tracker.start_gaze_calibration();
                self.publish(event.into());
            }
            TrackerCommand::CancelCalibration => {
                let event = self.tracker.cancel_calibration();
                self.publish(event.into());
            }
            TrackerCommand::UpdateSettings { update, reply } => {
                let store = Arc::clone(self.tracker.store());
                let before = store.settings();
                let result = store.update_settings(&update);
                // A failed write still leaves the new values in memory.
                self.apply_settings_change(&before, &store.settings());
                let _ = reply.send(result);
            }
            TrackerCommand::SetHeadPoseThresholds { thresholds, reply } => {
                let _ = reply.send(self.tracker.store().update_head_pose_thresholds(thresholds));
            }
            TrackerCommand::SetGazeRanges {
                horizontal_range,
                vertical_range,
                reply,
            } => {
                let result = self
                    .tracker
                    .store()
                    .update_gaze_ranges(horizontal_range, vertical_range);
                let _ = reply.send(result);
            }
            TrackerCommand::ResetCalibration { reply } => {
                let _ = reply.send(self.tracker.store().reset());
            }
        }
    }

    fn apply_settings_change(&mut self, before: &Settings, after: &Settings) {
        if before.smoothing_window != after.smoothing_window {
            if let Err(e) = self.tracker.set_smoothing_window(after.smoothing_window) {
                tracing::error!(error = %e, "Cannot rebuild smoothing filters");
                self.publish(TrackerEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        let capture_changed = before.camera_index != after.camera_index
            || before.frame_width != after.frame_width
            || before.frame_height != after.frame_height;
        if capture_changed && self.source.is_open() {
            tracing::info!(
                camera_index = after.camera_index,
                frame_width = after.frame_width,
                frame_height = after.frame_height,
                "Capture settings changed, reopening source"
            );
            self.source.close();
        }

        if before.log_to_csv != after.log_to_csv {
            if after.log_to_csv {
                self.open_csv();
            } else if let Some(mut csv) = self.csv.take() {
                if let Err(e) = csv.flush() {
                    tracing::warn!(error = %e, "Failed to flush tracking log");
                }
                tracing::info!(path = %csv.path().display(), "Tracking log closed");
            }
        }
    }

    fn open_csv(&mut self) {
        match TrackingLog::create(&self.config.log_dir) {
            Ok(log) => self.csv = Some(log),
            Err(e) => {
                tracing::error!(error = %e, dir = %self.config.log_dir.display(), "Cannot open tracking log");
                self.publish(TrackerEvent::Error {
                    message: format!("Cannot open tracking log: {e}"),
                });
            }
        }
    }

    fn publish(&self, event: TrackerEvent) {
        // No subscribers is fine; the UI may not be connected yet.
        let _ = self.events.send(event);
    }

    /// Sleep for `duration`; returns true when shutdown was signalled instead.
    async fn pause(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.shutdown_rx.recv() => true,
        }
    }

    fn stop(&mut self) {
        if let Some(mut csv) = self.csv.take() {
            if let Err(e) = csv.flush() {
                tracing::warn!(error = %e, "Failed to flush tracking log");
            }
        }
        self.source.close();
        tracing::info!("Capture worker stopped");
    }
}

/// Build the worker and run it on its own task.
pub fn spawn<S>(
    store: Arc<CalibrationStore>,
    source: S,
    config: &CaptureConfig,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(TrackerHandle, JoinHandle<()>), TrackingError>
where
    S: ObservationSource + 'static,
{
    let (worker, handle) = CaptureWorker::new(store, source, config, shutdown_rx)?;
    let join = tokio::spawn(worker.run());
    Ok((handle, join))
}
