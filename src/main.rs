use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use picks_gateway::config::Args;
use picks_gateway::error::Result;
use picks_gateway::state::{AppState, Limiters};
use picks_gateway::upstream::{UpstreamPool, health_checker};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("picks_gateway=info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!(error = %e, "gateway stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let policies = args.policies();
    let upstream = Arc::new(UpstreamPool::new(
        args.backend_urls()?,
        args.service_key.clone(),
        args.upstream_timeout(),
    )?);

    // limiters live for the whole process and are handed to handlers via state
    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        upstream: Arc::clone(&upstream),
        limiters: Limiters::new(policies),
    });

    let checker_client = state.client.clone();
    let interval = args.health_interval();
    tokio::spawn(async move {
        health_checker(upstream, checker_client, interval).await;
    });

    let app = picks_gateway::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(port = args.port, "gateway listening");
    for (name, policy) in [
        ("admin_sync", policies.admin_sync),
        ("league_create", policies.league_create),
        ("league_join", policies.league_join),
    ] {
        tracing::info!(
            category = name,
            max_requests = policy.max_requests,
            window_secs = policy.window.as_secs(),
            "rate limit policy"
        );
    }

    axum::serve(listener, app).await?;
    Ok(())
}
