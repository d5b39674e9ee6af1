use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Policies;
use crate::error::AppError;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::upstream::UpstreamPool;

pub type SharedClock = Arc<dyn Clock>;
pub type Limiter = RateLimiter<String, SharedClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitCategory {
    AdminSync,
    LeagueCreate,
    LeagueJoin,
}

impl LimitCategory {
    pub const ALL: [LimitCategory; 3] = [
        LimitCategory::AdminSync,
        LimitCategory::LeagueCreate,
        LimitCategory::LeagueJoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitCategory::AdminSync => "admin_sync",
            LimitCategory::LeagueCreate => "league_create",
            LimitCategory::LeagueJoin => "league_join",
        }
    }
}

impl fmt::Display for LimitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LimitCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::UnknownCategory(s.to_string()))
    }
}

/// One independent limiter per category, each with its own key space.
pub struct Limiters {
    pub admin_sync: Limiter,
    pub league_create: Limiter,
    pub league_join: Limiter,
}

impl Limiters {
    pub fn new(policies: Policies) -> Self {
        Self::with_clock(policies, Arc::new(SystemClock))
    }

    pub fn with_clock(policies: Policies, clock: SharedClock) -> Self {
        Self {
            admin_sync: RateLimiter::with_clock(policies.admin_sync, Arc::clone(&clock)),
            league_create: RateLimiter::with_clock(policies.league_create, Arc::clone(&clock)),
            league_join: RateLimiter::with_clock(policies.league_join, clock),
        }
    }

    pub fn get(&self, category: LimitCategory) -> &Limiter {
        match category {
            LimitCategory::AdminSync => &self.admin_sync,
            LimitCategory::LeagueCreate => &self.league_create,
            LimitCategory::LeagueJoin => &self.league_join,
        }
    }
}

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub upstream: Arc<UpstreamPool>,
    pub limiters: Limiters,
}
