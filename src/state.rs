use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::store::CalibrationStore;
use crate::workers::TrackerHandle;

#[derive(Clone)]
pub struct AppState {
    store: Arc<CalibrationStore>,
    tracker: TrackerHandle,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<CalibrationStore>,
        tracker: TrackerHandle,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            tracker,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    /// Read side of settings and calibration. Writes go through [`Self::tracker`].
    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn tracker(&self) -> &TrackerHandle {
        &self.tracker
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
