use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::{BackendStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends: Vec<BackendStatus> = state
        .upstream
        .all_backends()
        .iter()
        .map(|b| BackendStatus {
            url: b.url.clone(),
            healthy: b.is_healthy(),
        })
        .collect();

    let status = if backends.iter().any(|b| b.healthy) {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        backends,
    })
}
