mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use futures::StreamExt;

use common::app::{spawn_test_app, spawn_with_frames};
use common::http::{call, request};

/// Read SSE text until `needle` shows up.
async fn read_until(body: Body, needle: &str) -> String {
    let mut stream = body.into_data_stream();
    let mut text = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !text.contains(needle) {
            match stream.next().await {
                Some(Ok(chunk)) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(e)) => panic!("stream error: {e}"),
                None => break,
            }
        }
    })
    .await
    .expect("timed out reading event stream");
    text
}

#[tokio::test]
async fn it_sse_streams_status_events() {
    let app = spawn_test_app().await;
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.contains("text/event-stream"));

    let text = read_until(response.into_body(), r#""type":"status""#).await;
    assert!(text.contains("status"), "{text}");
    assert!(text.contains(r#""attention_ok":true"#), "{text}");
}

#[tokio::test]
async fn it_sse_reports_calibration_progress() {
    let app = spawn_test_app().await;
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;

    let (status, _) = call(&app.app, Method::POST, "/api/calibration/head-pose", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let text = read_until(response.into_body(), "Head pose calibration completed.").await;
    assert!(text.contains(r#""type":"calibration_step""#), "{text}");
    assert!(text.contains("Hold your head in a neutral position"), "{text}");
    assert!(text.contains(r#""type":"calibration_finished""#), "{text}");
}

#[tokio::test]
async fn it_sse_reports_source_errors() {
    let app = spawn_with_frames(&[]).await;
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;
    let text = read_until(response.into_body(), r#""type":"error""#).await;
    assert!(text.contains("Observation source unavailable"), "{text}");
}

#[tokio::test]
async fn it_sse_warns_when_user_looks_away() {
    let app = spawn_with_frames(&["{}"]).await;
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;
    let text = read_until(response.into_body(), r#""type":"warning_state_changed""#).await;
    let text = text + &read_until_more(&app).await;
    assert!(text.contains("Please look at the screen."), "{text}");
}

/// Status frames keep carrying the active warning.
async fn read_until_more(app: &common::app::TestApp) -> String {
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;
    read_until(response.into_body(), r#""warning_active":true"#).await
}

#[tokio::test]
async fn it_sse_ends_on_shutdown() {
    let app = spawn_test_app().await;
    let response = request(&app.app, Method::GET, "/api/events", None, &[]).await;
    app.shutdown_tx.send(()).unwrap();

    let mut stream = response.into_body().into_data_stream();
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.next().await {
            if chunk.is_err() {
                break;
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "stream did not end after shutdown");
}
