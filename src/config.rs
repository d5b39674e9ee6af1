use clap::Parser;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::rate_limit::RateLimitPolicy;

// Longest accepted rate limit window: one year
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "picks-gateway")]
#[command(about = "Rate-limited gateway in front of the picks backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Backend base urls (comma-separated)
    // Example: "localhost:54321,localhost:54322"
    #[arg(short, long, default_value = "localhost:54321")]
    pub backends: String,

    // Service key sent as `apikey` and bearer token on every RPC
    #[arg(long, env = "PICKS_SERVICE_KEY")]
    pub service_key: Option<String>,

    // Upstream request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub upstream_timeout: u64,

    // Health check interval in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_interval: u64,

    // Admin sync / upgrade: max requests per window
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub admin_sync_limit: u32,

    // Admin sync / upgrade: window in seconds
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub admin_sync_window: u64,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub league_create_limit: u32,

    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub league_create_window: u64,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub league_join_limit: u32,

    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub league_join_window: u64,
}

/// Rate limit policy for each gated category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    pub admin_sync: RateLimitPolicy,
    pub league_create: RateLimitPolicy,
    pub league_join: RateLimitPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            admin_sync: RateLimitPolicy::admin_sync(),
            league_create: RateLimitPolicy::league_create(),
            league_join: RateLimitPolicy::league_join(),
        }
    }
}

impl Args {
    pub fn policies(&self) -> Policies {
        Policies {
            admin_sync: RateLimitPolicy::new(
                self.admin_sync_limit,
                Duration::from_secs(self.admin_sync_window),
            ),
            league_create: RateLimitPolicy::new(
                self.league_create_limit,
                Duration::from_secs(self.league_create_window),
            ),
            league_join: RateLimitPolicy::new(
                self.league_join_limit,
                Duration::from_secs(self.league_join_window),
            ),
        }
    }

    // Split "host:port, http://host2" into full urls
    pub fn backend_urls(&self) -> Result<Vec<String>> {
        let urls: Vec<String> = self
            .backends
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|url| {
                let url = url.trim_end_matches('/');
                if url.starts_with("http") {
                    url.to_string()
                } else {
                    format!("http://{}", url)
                }
            })
            .collect();

        if urls.is_empty() {
            return Err(AppError::Config("at least one backend required".to_string()));
        }
        Ok(urls)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval)
    }
}
