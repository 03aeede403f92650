// Router assembly for the HTTP and WebSocket surface
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, snapshot, ws_endpoint};
use axum::{Router, routing::get};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Assets live under `/static`; any other unmatched path falls through to the same
/// directory, so `/` serves its `index.html`.
pub fn build_router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    let static_dir = static_dir.as_ref();
    Router::new()
        .route("/healthz", get(health_check))
        .route("/snapshot", get(snapshot))
        .route("/ws", get(ws_endpoint))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
