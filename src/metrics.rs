use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, IntCounterVec, IntGaugeVec, TextEncoder, register_counter,
    register_histogram, register_int_counter_vec, register_int_gauge_vec,
};

use crate::state::{LimitCategory, Limiters};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("picks_requests_total", "Total number of gated requests").unwrap();
    pub static ref GATE_DECISIONS: IntCounterVec = register_int_counter_vec!(
        "picks_gate_decisions_total",
        "Rate limit decisions by category and outcome",
        &["category", "outcome"]
    )
    .unwrap();
    pub static ref TRACKED_KEYS: IntGaugeVec = register_int_gauge_vec!(
        "picks_limiter_tracked_keys",
        "Caller keys currently held by each limiter",
        &["category"]
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "picks_upstream_latency_seconds",
        "Upstream RPC latency in seconds"
    )
    .unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("picks_upstream_failures_total", "Failed upstream RPCs").unwrap();
}

pub fn record_decision(category: LimitCategory, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    GATE_DECISIONS
        .with_label_values(&[category.as_str(), outcome])
        .inc();
}

pub fn update_tracked_keys(limiters: &Limiters) {
    for category in LimitCategory::ALL {
        TRACKED_KEYS
            .with_label_values(&[category.as_str()])
            .set(limiters.get(category).len() as i64);
    }
}

// Text exposition of the default registry
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
