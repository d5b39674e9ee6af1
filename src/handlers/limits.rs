use axum::{Json, extract::{Path, State}};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{LimitStatus, caller_key};
use crate::state::{AppState, LimitCategory};

// Remaining cooldown for a caller, for UI countdowns
pub async fn limit_status_handler(
    State(state): State<Arc<AppState>>,
    Path((category, user_id)): Path<(String, String)>,
) -> Result<Json<LimitStatus>> {
    let category: LimitCategory = category.parse()?;
    let key = caller_key(&user_id)?;
    let limiter = state.limiters.get(category);
    let policy = limiter.policy();

    Ok(Json(LimitStatus {
        category: category.to_string(),
        user_id: key.to_string(),
        time_until_reset_ms: limiter.time_until_reset(key),
        max_requests: policy.max_requests,
        window_ms: policy.window.as_millis() as u64,
    }))
}
