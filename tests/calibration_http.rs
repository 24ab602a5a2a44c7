mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::app::{spawn_test_app, spawn_with_frames};
use common::http::{assert_json_error, assert_status_ok_json, call};

async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn it_get_calibration_returns_defaults() {
    let app = spawn_test_app().await;
    let (status, body) = call(&app.app, Method::GET, "/api/calibration", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["head_pose"]["baseline"], json!([0.0, 0.0, 0.0]));
    assert_eq!(body["data"]["head_pose"]["thresholds"], json!([15.0, 15.0, 15.0]));
    assert_eq!(body["data"]["gaze"]["horizontal_range"], json!([-0.3, 0.3]));
}

#[tokio::test]
async fn it_set_thresholds_and_ranges() {
    let app = spawn_test_app().await;
    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/calibration/head-pose/thresholds",
        Some(json!({ "thresholds": [10.0, 12.0, 20.0] })),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["head_pose"]["thresholds"], json!([10.0, 12.0, 20.0]));

    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/calibration/gaze/ranges",
        Some(json!({ "horizontal_range": [-0.4, 0.2], "vertical_range": [-0.1, 0.5] })),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(app.store.calibration().gaze.horizontal_range, [-0.4, 0.2]);
}

#[tokio::test]
async fn it_rejects_inverted_gaze_range() {
    let app = spawn_test_app().await;
    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/calibration/gaze/ranges",
        Some(json!({ "horizontal_range": [0.3, -0.3], "vertical_range": [-0.3, 0.3] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
    assert_eq!(app.store.calibration().gaze.horizontal_range, [-0.3, 0.3]);
}

#[tokio::test]
async fn it_rejects_negative_threshold() {
    let app = spawn_test_app().await;
    let (status, body) = call(
        &app.app,
        Method::PUT,
        "/api/calibration/head-pose/thresholds",
        Some(json!({ "thresholds": [10.0, -1.0, 20.0] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
}

#[tokio::test]
async fn it_head_pose_calibration_sets_baseline() {
    let app = spawn_with_frames(&[r#"{"head_angles": [6, -4, 2], "gaze_vector": [0, 0]}"#]).await;
    let (status, body) = call(&app.app, Method::POST, "/api/calibration/head-pose", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["started"], "head_pose");

    let store = app.store.clone();
    wait_for(move || store.calibration().head_pose.baseline == [6.0, -4.0, 2.0]).await;
    assert_eq!(app.store.calibration().head_pose.thresholds, [15.0, 15.0, 15.0]);
}

#[tokio::test]
async fn it_gaze_calibration_sets_ranges() {
    let app = spawn_with_frames(&[
        r#"{"head_angles": [0, 0, 0], "gaze_vector": [0.25, 0.25]}"#,
    ])
    .await;
    let (status, _) = call(&app.app, Method::POST, "/api/calibration/gaze", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let store = app.store.clone();
    wait_for(move || store.calibration().gaze.horizontal_range != [-0.3, 0.3]).await;
    let gaze = app.store.calibration().gaze;
    assert!((gaze.horizontal_range[0] - 0.2).abs() < 1e-9);
    assert!((gaze.horizontal_range[1] - 0.3).abs() < 1e-9);
    assert!((gaze.vertical_range[0] - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn it_cancel_and_reset() {
    let app = spawn_test_app().await;
    call(
        &app.app,
        Method::PUT,
        "/api/calibration/head-pose/thresholds",
        Some(json!({ "thresholds": [1.0, 2.0, 3.0] })),
    )
    .await;

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/cancel", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["cancelled"], true);

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/reset", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["head_pose"]["thresholds"], json!([15.0, 15.0, 15.0]));
}

#[tokio::test]
async fn it_commands_fail_after_worker_stops() {
    let app = spawn_test_app().await;
    app.shutdown_tx.send(()).unwrap();
    // Let the worker observe shutdown and drop its receiver.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = call(&app.app, Method::POST, "/api/calibration/head-pose", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_json_error(&body, "TRACKER_UNAVAILABLE");
}
