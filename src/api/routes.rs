//! API route definitions.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::audit::{audit_middleware, AuditLogger};

use super::handlers::{self, AppState};

/// Build the full router over the shared state.
pub fn create_router(state: AppState) -> Router {
    let audit_logger: Arc<AuditLogger> = state.audit.clone();

    Router::new()
        // Health and monitoring
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        // MCP surface
        .route("/mcp", get(handlers::mcp_index))
        .route("/mcp/checkCostImpact", post(handlers::check_cost_impact))
        .route("/mcp/suggestOptimizations", post(handlers::suggest_optimizations))
        .route("/mcp/evaluatePolicy", post(handlers::evaluate_policy))
        .route("/mcp/getPriceCatalog", post(handlers::get_price_catalog))
        .route("/mcp/listRecentAnalyses", post(handlers::list_recent_analyses))
        // Policy CRUD
        .route("/mcp/policies", get(handlers::list_policies).post(handlers::create_policy))
        .route(
            "/mcp/policies/:policy_id",
            get(handlers::get_policy)
                .put(handlers::update_policy)
                .delete(handlers::delete_policy),
        )
        // Webhook management
        .route("/webhooks", post(handlers::create_webhook).get(handlers::list_webhooks))
        .route(
            "/webhooks/:webhook_id",
            get(handlers::get_webhook)
                .put(handlers::update_webhook)
                .delete(handlers::delete_webhook),
        )
        .route("/webhooks/:webhook_id/deliveries", get(handlers::list_webhook_deliveries))
        .route("/webhooks/:webhook_id/test", post(handlers::test_webhook))
        // Usage analytics (advisory)
        .route("/usage/summary", post(handlers::usage_summary))
        // Audit surface
        .route("/audit/query", post(handlers::query_audit_events))
        .route("/audit/compliance-report", post(handlers::compliance_report))
        .layer(middleware::from_fn_with_state(audit_logger, audit_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Record request count and latency for every request.
async fn metrics_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    crate::metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
