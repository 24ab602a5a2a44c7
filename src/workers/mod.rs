pub mod capture;
pub mod tracking_log;

pub use capture::{spawn as spawn_capture, CaptureError, CaptureWorker, TrackerCommand, TrackerHandle};
pub use tracking_log::TrackingLog;
