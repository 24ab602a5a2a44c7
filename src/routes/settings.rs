use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::schema::SettingsUpdate;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).patch(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    ok(state.store().settings())
}

async fn update_settings(
    State(state): State<AppState>,
    JsonBody(update): JsonBody<SettingsUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if update.is_empty() {
        return Ok(ok(state.store().settings()));
    }
    let settings = state.tracker().update_settings(update).await?;
    Ok(ok(settings))
}
