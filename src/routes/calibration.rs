use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{accepted, ok, AppError};
use crate::state::AppState;
use crate::tracking::types::CalibrationKind;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_calibration))
        .route("/head-pose", post(start_head_pose))
        .route("/head-pose/thresholds", put(set_head_pose_thresholds))
        .route("/gaze", post(start_gaze))
        .route("/gaze/ranges", put(set_gaze_ranges))
        .route("/cancel", post(cancel))
        .route("/reset", post(reset))
}

async fn get_calibration(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    ok(state.store().calibration())
}

async fn start_head_pose(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.tracker().start_head_pose_calibration().await?;
    Ok(accepted(serde_json::json!({ "started": CalibrationKind::HeadPose })))
}

async fn start_gaze(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.tracker().start_gaze_calibration().await?;
    Ok(accepted(serde_json::json!({ "started": CalibrationKind::Gaze })))
}

async fn cancel(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    state.tracker().cancel_calibration().await?;
    Ok(accepted(serde_json::json!({ "cancelled": true })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdsRequest {
    thresholds: [f64; 3],
}

async fn set_head_pose_thresholds(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ThresholdsRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.tracker().set_head_pose_thresholds(req.thresholds).await?;
    Ok(ok(state.store().calibration()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GazeRangesRequest {
    horizontal_range: [f64; 2],
    vertical_range: [f64; 2],
}

async fn set_gaze_ranges(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GazeRangesRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state
        .tracker()
        .set_gaze_ranges(req.horizontal_range, req.vertical_range)
        .await?;
    Ok(ok(state.store().calibration()))
}

async fn reset(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    state.tracker().reset_calibration().await?;
    Ok(ok(state.store().calibration()))
}
