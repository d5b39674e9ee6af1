use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

use super::gate;
use crate::error::{AppError, Result};
use crate::models::{CreateLeagueRequest, JoinLeagueRequest, caller_key, normalize_invite_code};
use crate::state::{AppState, LimitCategory};

pub async fn create_league_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLeagueRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let key = caller_key(&payload.user_id)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("name must not be empty".to_string()));
    }
    gate(&state, LimitCategory::LeagueCreate, key)?;

    let league = state
        .upstream
        .call(
            &state.client,
            "create_league",
            &json!({ "owner_id": key, "league_name": name }),
        )
        .await?;

    tracing::info!(user_id = key, league = name, "league created");
    Ok((StatusCode::CREATED, Json(league)))
}

pub async fn join_league_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JoinLeagueRequest>,
) -> Result<Json<Value>> {
    let key = caller_key(&payload.user_id)?;
    let code = normalize_invite_code(&payload.invite_code)?;
    gate(&state, LimitCategory::LeagueJoin, key)?;

    let result = state
        .upstream
        .call(
            &state.client,
            "join_league_by_code",
            &json!({ "user_id": key, "invite_code": code }),
        )
        .await?;

    Ok(Json(result))
}
