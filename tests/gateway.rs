use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{HeaderMap, Request, StatusCode, header},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use picks_gateway::config::Policies;
use picks_gateway::rate_limit::{ManualClock, RateLimitPolicy};
use picks_gateway::state::{AppState, Limiters};
use picks_gateway::upstream::UpstreamPool;

const START: i64 = 1_760_000_000_000;

// Stand-in for the backend's RPC endpoint: echoes what it was called with
async fn spawn_upstream() -> String {
    async fn rpc(
        Path(function): Path<String>,
        headers: HeaderMap,
        Json(params): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if params["league_name"] == "taken" {
            return (StatusCode::CONFLICT, Json(json!({"message": "name taken"})));
        }
        let apikey = headers
            .get("apikey")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (
            StatusCode::OK,
            Json(json!({"function": function, "params": params, "apikey": apikey})),
        )
    }

    let app = Router::new()
        .route("/rest/v1/", get(|| async { "ok" }))
        .route("/rest/v1/rpc/{function}", post(rpc));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(base_url: String, policies: Policies, clock: &ManualClock) -> Router {
    let upstream = UpstreamPool::new(
        vec![base_url],
        Some("service-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        upstream: Arc::new(upstream),
        limiters: Limiters::with_clock(policies, Arc::new(clock.clone())),
    });
    picks_gateway::router(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bare(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn join_is_limited_per_window() {
    let clock = ManualClock::new(START);
    let policies = Policies {
        league_join: RateLimitPolicy::new(2, Duration::from_secs(60)),
        ..Policies::default()
    };
    let app = gateway(spawn_upstream().await, policies, &clock);
    let join = || post_json("/api/leagues/join", json!({"user_id": "u1", "invite_code": " ab12 "}));

    for _ in 0..2 {
        let response = app.clone().oneshot(join()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["function"], "join_league_by_code");
        assert_eq!(body["params"]["invite_code"], "AB12");
        assert_eq!(body["apikey"], "service-key");
    }

    clock.advance(Duration::from_millis(500));
    let response = app.clone().oneshot(join()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    let body = body_json(response).await;
    assert_eq!(body["code"], "rate_limited");
    assert_eq!(body["retry_after_ms"], 59_500);
    assert_eq!(body["message"], "Too many requests. Try again in 60 seconds.");

    clock.advance(Duration::from_secs(60));
    let response = app.clone().oneshot(join()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn callers_do_not_share_a_window() {
    let clock = ManualClock::new(START);
    let app = gateway(spawn_upstream().await, Policies::default(), &clock);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin-a"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .clone()
        .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin-a"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .clone()
        .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin-b"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upgrade_shares_admin_limiter_with_sync() {
    let clock = ManualClock::new(START);
    let policies = Policies {
        admin_sync: RateLimitPolicy::new(1, Duration::from_secs(300)),
        ..Policies::default()
    };
    let app = gateway(spawn_upstream().await, policies, &clock);

    let response = app
        .clone()
        .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/upgrade-user",
            json!({"user_id": "admin", "target_user_id": "u9"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn status_reports_cooldown_that_callers_cannot_clear() {
    let clock = ManualClock::new(START);
    let app = gateway(spawn_upstream().await, Policies::default(), &clock);

    let response = app
        .clone()
        .oneshot(bare("GET", "/api/limits/league_create/u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["time_until_reset_ms"], 0);
    assert_eq!(body["max_requests"], 5);
    assert_eq!(body["window_ms"], 600_000);

    let response = app
        .clone()
        .oneshot(post_json("/api/leagues", json!({"user_id": "u1", "name": "Sunday League"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["params"]["league_name"], "Sunday League");

    clock.advance(Duration::from_secs(100));
    let body = body_json(
        app.clone()
            .oneshot(bare("GET", "/api/limits/league_create/u1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["time_until_reset_ms"], 500_000);

    let response = app
        .clone()
        .oneshot(bare("DELETE", "/api/limits/league_create/u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body = body_json(
        app.clone()
            .oneshot(bare("GET", "/api/limits/league_create/u1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["time_until_reset_ms"], 500_000);
}

#[tokio::test]
async fn bad_input_is_rejected_before_the_limiter() {
    let clock = ManualClock::new(START);
    let policies = Policies {
        league_join: RateLimitPolicy::new(1, Duration::from_secs(60)),
        ..Policies::default()
    };
    let app = gateway(spawn_upstream().await, policies, &clock);

    let response = app
        .clone()
        .oneshot(post_json("/api/leagues/join", json!({"user_id": "  ", "invite_code": "X"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json("/api/leagues/join", json!({"user_id": "u1", "invite_code": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // neither attempt consumed the single slot
    let response = app
        .clone()
        .oneshot(post_json("/api/leagues/join", json!({"user_id": "u1", "invite_code": "X"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(bare("GET", "/api/limits/picks/u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "unknown_category");
}

#[tokio::test]
async fn upstream_rejection_is_a_bad_gateway() {
    let clock = ManualClock::new(START);
    let app = gateway(spawn_upstream().await, Policies::default(), &clock);

    let response = app
        .clone()
        .oneshot(post_json("/api/leagues", json!({"user_id": "u1", "name": "taken"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "upstream_status");
}

#[tokio::test]
async fn dead_upstream_degrades_health() {
    let clock = ManualClock::new(START);
    let app = gateway("http://127.0.0.1:1".to_string(), Policies::default(), &clock);

    let response = app
        .clone()
        .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app
        .clone()
        .oneshot(post_json("/api/admin/sync", json!({"user_id": "admin"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(app.clone().oneshot(bare("GET", "/health")).await.unwrap()).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["backends"][0]["healthy"], false);
}

#[tokio::test]
async fn metrics_expose_gate_decisions() {
    let clock = ManualClock::new(START);
    let app = gateway(spawn_upstream().await, Policies::default(), &clock);

    app.clone()
        .oneshot(post_json("/api/leagues/join", json!({"user_id": "m1", "invite_code": "Q"})))
        .await
        .unwrap();

    let response = app.clone().oneshot(bare("GET", "/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("picks_gate_decisions_total"));
    assert!(text.contains("picks_limiter_tracked_keys{category=\"league_join\"}"));
    assert!(text.contains("picks_limiter_tracked_keys{category=\"admin_sync\"}"));
}
