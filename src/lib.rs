pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod upstream;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/admin/sync", post(handlers::sync_handler))
        .route("/api/admin/upgrade-user", post(handlers::upgrade_user_handler))
        .route("/api/leagues", post(handlers::create_league_handler))
        .route("/api/leagues/join", post(handlers::join_league_handler))
        .route("/api/limits/{category}/{user_id}", get(handlers::limit_status_handler))
        .with_state(state)
}
