use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::metrics::{render, update_tracked_keys};
use crate::state::AppState;

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    update_tracked_keys(&state.limiters);
    render()
}
