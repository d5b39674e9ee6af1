use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::ErrorBody;
use crate::state::LimitCategory;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded for {category}")]
    RateLimited {
        category: LimitCategory,
        retry_after_ms: u64,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown limit category: {0}")]
    UnknownCategory(String),

    #[error("No healthy backends available")]
    NoHealthyBackends,

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidRequest(_) | AppError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
            AppError::NoHealthyBackends => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) | AppError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::RateLimited { .. } => "rate_limited",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::UnknownCategory(_) => "unknown_category",
            AppError::NoHealthyBackends => "no_healthy_backends",
            AppError::Upstream(_) => "upstream_error",
            AppError::UpstreamStatus { .. } => "upstream_status",
            AppError::Config(_) => "config_error",
            AppError::Io(_) => "io_error",
        }
    }
}

/// Whole seconds for `Retry-After`, rounded up and never below one.
pub fn retry_after_secs(retry_after_ms: u64) -> u64 {
    retry_after_ms.div_ceil(1000).max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        match self {
            AppError::RateLimited {
                category,
                retry_after_ms,
            } => {
                let secs = retry_after_secs(retry_after_ms);
                let body = ErrorBody {
                    error: format!("Rate limit exceeded for {}", category),
                    code: code.to_string(),
                    retry_after_ms: Some(retry_after_ms),
                    message: Some(format!("Too many requests. Try again in {} seconds.", secs)),
                };
                (status, [(header::RETRY_AFTER, secs.to_string())], Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    error: other.to_string(),
                    code: code.to_string(),
                    retry_after_ms: None,
                    message: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
