pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod mailer;
pub mod notify;
pub mod realtime;
pub mod seed;
pub mod shared;
pub mod stats;
pub mod storage;
pub mod tickets;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use shared::state::AppState;

/// Assemble the full API router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(tickets::router())
        .merge(notify::router())
        .merge(stats::router())
        .merge(directory::router())
        .merge(realtime::router())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
