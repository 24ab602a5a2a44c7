use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use gaze_guard::config::{CaptureConfig, Config};
use gaze_guard::routes::build_router;
use gaze_guard::source::ReplaySource;
use gaze_guard::state::AppState;
use gaze_guard::store::CalibrationStore;
use gaze_guard::workers::spawn_capture;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<CalibrationStore>,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    temp_dir: TempDir,
}

impl TestApp {
    pub fn config_path(&self) -> PathBuf {
        self.config.config_path.clone()
    }

    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    // Built directly so tests never race on process env vars.
    Config {
        host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        port: 0,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: temp_dir.path().join("logs").to_string_lossy().into_owned(),
        cors_origin: "http://localhost:5173".to_string(),
        config_path: temp_dir.path().join("config.json"),
        capture: CaptureConfig {
            source_path: temp_dir.path().join("observations.jsonl"),
            loop_replay: true,
            frame_interval: Duration::from_millis(1),
            source_retry: Duration::from_millis(10),
            read_retry: Duration::from_millis(1),
            event_channel_capacity: 4096,
            command_channel_capacity: 32,
            log_dir: temp_dir.path().join("logs"),
        },
    }
}

/// App whose replay source loops over `frames` (JSON lines). With no frames the
/// source file is absent and the worker keeps retrying.
pub async fn spawn_with_frames(frames: &[&str]) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&temp_dir);

    if !frames.is_empty() {
        std::fs::write(&config.capture.source_path, frames.join("\n")).expect("write frames");
    }

    let store = Arc::new(CalibrationStore::open(&config.config_path));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let source = ReplaySource::new(&config.capture.source_path, config.capture.loop_replay);
    let (tracker, _join) = spawn_capture(
        store.clone(),
        source,
        &config.capture,
        shutdown_tx.subscribe(),
    )
    .expect("spawn capture worker");

    let state = AppState::new(store.clone(), tracker, &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        store,
        config,
        shutdown_tx,
        temp_dir,
    }
}

/// A user looking straight at the screen on every frame.
pub async fn spawn_test_app() -> TestApp {
    spawn_with_frames(&[r#"{"head_angles": [0, 0, 0], "gaze_vector": [0, 0]}"#]).await
}
