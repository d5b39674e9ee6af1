use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use super::gate;
use crate::error::Result;
use crate::models::{SyncRequest, UpgradeUserRequest, caller_key};
use crate::state::{AppState, LimitCategory};

pub async fn sync_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<Value>> {
    let key = caller_key(&payload.user_id)?;
    gate(&state, LimitCategory::AdminSync, key)?;

    tracing::info!(user_id = key, "standings sync triggered");
    let result = state
        .upstream
        .call(&state.client, "refresh_standings", &json!({ "triggered_by": key }))
        .await?;

    Ok(Json(result))
}

// Shares the admin limiter with sync
pub async fn upgrade_user_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpgradeUserRequest>,
) -> Result<Json<Value>> {
    let key = caller_key(&payload.user_id)?;
    let target = caller_key(&payload.target_user_id)?;
    gate(&state, LimitCategory::AdminSync, key)?;

    tracing::info!(user_id = key, target_user = target, "admin upgrade requested");
    let result = state
        .upstream
        .call(
            &state.client,
            "upgrade_user_to_admin",
            &json!({ "requested_by": key, "target_user_id": target }),
        )
        .await?;

    Ok(Json(result))
}
