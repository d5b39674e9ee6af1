mod admin;
mod health;
mod leagues;
mod limits;
mod metrics;

pub use admin::{sync_handler, upgrade_user_handler};
pub use health::health_handler;
pub use leagues::{create_league_handler, join_league_handler};
pub use limits::limit_status_handler;
pub use metrics::metrics_handler;

use crate::error::{AppError, Result};
use crate::metrics::{REQUEST_TOTAL, record_decision};
use crate::rate_limit::check_rate_limit;
use crate::state::{AppState, LimitCategory};

// Count one request for `key` against `category`, or refuse it
fn gate(state: &AppState, category: LimitCategory, key: &str) -> Result<()> {
    REQUEST_TOTAL.inc();

    let decision = check_rate_limit(state.limiters.get(category), key);
    record_decision(category, decision.allowed);

    if !decision.allowed {
        tracing::debug!(%category, key, retry_after_ms = decision.time_until_reset, "rate limited");
        return Err(AppError::RateLimited {
            category,
            retry_after_ms: decision.time_until_reset,
        });
    }
    Ok(())
}
