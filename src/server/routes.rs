//! Router definition for the control surface

use super::{handlers, state::AppState};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/control/next", get(handlers::next_slide))
        .route("/control/previous", get(handlers::previous_slide))
        .route("/state", get(handlers::current_slide))
        .route("/all_notes", get(handlers::all_notes))
        // remotes are served from other devices
        .layer(CorsLayer::permissive())
        .with_state(state)
}
