pub mod calibration;
pub mod events;
pub mod health;
pub mod settings;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

/// Settings and calibration bodies are tiny.
const MAX_BODY_SIZE: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/settings", settings::router())
        .nest("/calibration", calibration::router())
        .nest("/events", events::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> AppError {
    AppError::not_found("Not found")
}
