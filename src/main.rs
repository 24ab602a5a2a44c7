use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use gaze_guard::config::Config;
use gaze_guard::logging::init_tracing;
use gaze_guard::routes::build_router;
use gaze_guard::source::ReplaySource;
use gaze_guard::state::AppState;
use gaze_guard::store::CalibrationStore;
use gaze_guard::workers::spawn_capture;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&config.log_config()).expect("Failed to initialize logging");
    tracing::info!(config_path = %config.config_path.display(), "Starting gaze-guard");

    let store = Arc::new(CalibrationStore::open(&config.config_path));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let source = ReplaySource::new(&config.capture.source_path, config.capture.loop_replay);
    let (tracker, capture_handle) = spawn_capture(
        store.clone(),
        source,
        &config.capture,
        shutdown_tx.subscribe(),
    )
    .expect("Loaded settings are range-checked by the store");

    let state = AppState::new(store.clone(), tracker, &config, shutdown_tx.clone());

    let app = build_router(state)
        .layer(build_cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    let server_future = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
        let _ = shutdown_tx.send(());
    }

    match capture_handle.await {
        Ok(()) => tracing::info!("Capture worker exited"),
        Err(e) => tracing::error!(error = %e, "Capture worker panicked"),
    }

    if let Err(e) = store.save() {
        tracing::error!(error = %e, "Failed to save calibration store before exit");
    }
    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH]);

    if config.cors_origin.trim() == "*" {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            o.parse::<HeaderValue>()
                .unwrap_or_else(|e| panic!("FATAL: Invalid CORS_ORIGIN '{o}': {e}"))
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
