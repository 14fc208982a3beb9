//! Prometheus metrics registry and recorders.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec, Encoder,
    HistogramVec, Registry, TextEncoder,
};

/// Process-wide metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static HTTP_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec_with_registry!(
        "finopsguard_http_requests_total",
        "HTTP requests by method, path and status",
        &["method", "path", "status"],
        REGISTRY
    )
    .expect("metric registration")
});

static HTTP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec_with_registry!(
        "finopsguard_http_request_duration_seconds",
        "HTTP request latency",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        REGISTRY
    )
    .expect("metric registration")
});

static ANALYSES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec_with_registry!(
        "finopsguard_analyses_total",
        "Cost analyses by environment and policy status",
        &["environment", "policy_status"],
        REGISTRY
    )
    .expect("metric registration")
});

static POLICY_VIOLATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec_with_registry!(
        "finopsguard_policy_violations_total",
        "Policy violations by policy id and severity",
        &["policy_id", "severity"],
        REGISTRY
    )
    .expect("metric registration")
});

static WEBHOOK_DELIVERIES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec_with_registry!(
        "finopsguard_webhook_deliveries_total",
        "Webhook delivery attempts by event type and outcome",
        &["event_type", "outcome"],
        REGISTRY
    )
    .expect("metric registration")
});

pub fn record_http_request(method: &str, path: &str, status: u16, duration_seconds: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_DURATION
        .with_label_values(&[method, path])
        .observe(duration_seconds);
}

pub fn record_analysis(environment: &str, policy_status: &str) {
    ANALYSES
        .with_label_values(&[environment, policy_status])
        .inc();
}

pub fn record_policy_violation(policy_id: &str, severity: &str) {
    POLICY_VIOLATIONS
        .with_label_values(&[policy_id, severity])
        .inc();
}

pub fn record_webhook_delivery(event_type: &str, outcome: &str) {
    WEBHOOK_DELIVERIES
        .with_label_values(&[event_type, outcome])
        .inc();
}

/// Render the registry in the Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
