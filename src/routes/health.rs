use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let capture = &state.config().capture;
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": state.uptime_secs(),
        "config_path": state.store().path().display().to_string(),
        "observation_source": capture.source_path.display().to_string(),
        "frame_interval_ms": capture.frame_interval.as_millis() as u64,
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
