mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::http::{call, request, response_json};

#[tokio::test]
async fn it_health_and_live() {
    let app = spawn_test_app().await;

    let live = request(&app.app, Method::GET, "/health/live", None, &[]).await;
    let (live_status, _, _) = response_json(live).await;
    assert_eq!(live_status, StatusCode::OK);

    let (status, body) = call(&app.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["config_path"].as_str().unwrap().ends_with("config.json"));
    assert!(body["observation_source"]
        .as_str()
        .unwrap()
        .ends_with("observations.jsonl"));
    assert_eq!(body["frame_interval_ms"], 1);
}

#[tokio::test]
async fn it_unknown_route_is_json_404() {
    let app = spawn_test_app().await;
    let (status, body) = call(&app.app, Method::GET, "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
