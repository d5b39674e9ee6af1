use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// Admin standings sync trigger
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SyncRequest {
    pub user_id: String,
}

// Admin upgrading another user
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UpgradeUserRequest {
    pub user_id: String,
    pub target_user_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CreateLeagueRequest {
    pub user_id: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct JoinLeagueRequest {
    pub user_id: String,
    pub invite_code: String,
}

// Cooldown status for one caller in one category
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LimitStatus {
    pub category: String,
    pub user_id: String,
    pub time_until_reset_ms: u64,
    pub max_requests: u32,
    pub window_ms: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BackendStatus {
    pub url: String,
    pub healthy: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub backends: Vec<BackendStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// Caller keys must be non-empty once trimmed
pub fn caller_key(user_id: &str) -> Result<&str> {
    let key = user_id.trim();
    if key.is_empty() {
        return Err(AppError::InvalidRequest("user_id must not be empty".to_string()));
    }
    Ok(key)
}

// Invite codes are matched case-insensitively upstream; send them upper-cased
pub fn normalize_invite_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::InvalidRequest("invite_code must not be empty".to_string()));
    }
    Ok(code.to_uppercase())
}
