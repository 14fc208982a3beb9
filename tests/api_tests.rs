//! Integration tests for the HTTP surface, driven through the router with
//! `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine as _;
use finopsguard::{build_test_state, create_router};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn encode(payload: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(payload)
}

#[tokio::test]
async fn healthz_reports_components() {
    let router = create_router(build_test_state().await);
    let response = router.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["api"], "ok");
    assert_eq!(body["components"]["database"], "disabled");
    assert_eq!(body["components"]["cache"], "disabled");
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let router = create_router(build_test_state().await);
    let response = router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn check_cost_impact_end_to_end() {
    let router = create_router(build_test_state().await);
    let hcl = r#"
provider "aws" { region = "us-east-1" }
resource "aws_instance" "x" { instance_type = "t3.medium" }
"#;
    let response = router
        .oneshot(post(
            "/mcp/checkCostImpact",
            json!({
                "iac_type": "terraform",
                "iac_payload": encode(hcl),
                "environment": "prod"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["estimated_monthly_cost"], json!(30.37));
    assert_eq!(body["estimated_first_week_cost"], json!(6.99));
    assert_eq!(body["pricing_confidence"], "high");
    assert_eq!(body["policy_eval"]["status"], "pass");
    assert!(body["duration_ms"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn invalid_payload_encoding_is_400() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/mcp/checkCostImpact",
            json!({
                "iac_type": "terraform",
                "iac_payload": "!!!not base64!!!",
                "environment": "dev"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid_payload_encoding");
}

#[tokio::test]
async fn empty_payload_is_invalid_request() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/mcp/checkCostImpact",
            json!({
                "iac_type": "terraform",
                "iac_payload": "",
                "environment": "dev"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn price_catalog_lists_aws_skus() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/mcp/getPriceCatalog",
            json!({"cloud": "aws", "region": "us-east-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["pricing_confidence"], "high");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().any(|item| item["sku"] == "aws_ec2_t3.medium_ondemand_us-east-1"));
}

#[tokio::test]
async fn price_catalog_resolves_gcp_skus_through_factory() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/mcp/getPriceCatalog",
            json!({
                "cloud": "gcp",
                "region": "us-central1",
                "instance_types": ["e2-standard-4", "z9-unknown"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["price"], json!(0.134));
    // The unknown SKU drags the aggregate confidence down.
    assert_eq!(body["pricing_confidence"], "low");
}

#[tokio::test]
async fn usage_summary_reports_disabled_integration() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/usage/summary",
            json!({
                "cloud_provider": "aws",
                "start_time": "2026-07-01T00:00:00Z",
                "end_time": "2026-07-31T00:00:00Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["available"], json!(false));
}

#[tokio::test]
async fn policy_crud_lifecycle() {
    let state = build_test_state().await;

    // Defaults are listed.
    let response = create_router(state.clone())
        .oneshot(get("/mcp/policies"))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["policies"].as_array().unwrap().len(), 3);

    // Create.
    let response = create_router(state.clone())
        .oneshot(post(
            "/mcp/policies",
            json!({
                "id": "team_budget",
                "name": "Team Budget",
                "budget": 250.0,
                "on_violation": "advisory",
                "enabled": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Fetch equivalently.
    let response = create_router(state.clone())
        .oneshot(get("/mcp/policies/team_budget"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["budget"], json!(250.0));
    assert_eq!(body["on_violation"], "advisory");

    // Update.
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/mcp/policies/team_budget")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "id": "team_budget",
                        "name": "Team Budget v2",
                        "budget": 300.0,
                        "on_violation": "block",
                        "enabled": true
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Delete.
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/mcp/policies/team_budget")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Gone now.
    let response = create_router(state)
        .oneshot(get("/mcp/policies/team_budget"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evaluate_policy_missing_id_is_404() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post(
            "/mcp/evaluatePolicy",
            json!({
                "iac_type": "terraform",
                "iac_payload": encode("resource \"aws_instance\" \"x\" {}"),
                "policy_id": "no_such_policy"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evaluate_policy_budget_failure() {
    let router = create_router(build_test_state().await);
    // 20 x m5.large = $1401.60/month, over the $1000 default budget.
    let hcl = r#"
resource "aws_instance" "fleet" {
  count         = 20
  instance_type = "m5.large"
}
"#;
    let response = router
        .oneshot(post(
            "/mcp/evaluatePolicy",
            json!({
                "iac_type": "terraform",
                "iac_payload": encode(hcl),
                "policy_id": "default_monthly_budget",
                "environment": "prod",
                "mode": "blocking"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "fail");
    assert!(body["reason"].as_str().unwrap().contains("exceeds budget"));
}

#[tokio::test]
async fn evaluate_policy_within_budget_passes() {
    let router = create_router(build_test_state().await);
    let hcl = r#"resource "aws_instance" "x" { instance_type = "t3.micro" }"#;
    let response = router
        .oneshot(post(
            "/mcp/evaluatePolicy",
            json!({
                "iac_type": "terraform",
                "iac_payload": encode(hcl),
                "policy_id": "default_monthly_budget",
                "environment": "dev"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "pass");
}

#[tokio::test]
async fn webhook_crud_and_validation() {
    let state = build_test_state().await;

    // Bad URL rejected.
    let response = create_router(state.clone())
        .oneshot(post(
            "/webhooks",
            json!({
                "name": "bad",
                "url": "ftp://example.com",
                "events": ["budget_exceeded"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Reserved header rejected.
    let response = create_router(state.clone())
        .oneshot(post(
            "/webhooks",
            json!({
                "name": "bad",
                "url": "https://example.com",
                "events": ["budget_exceeded"],
                "headers": {"Authorization": "Bearer nope"}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Valid create.
    let response = create_router(state.clone())
        .oneshot(post(
            "/webhooks",
            json!({
                "name": "alerts",
                "url": "https://hooks.example.com/x",
                "events": ["budget_exceeded", "policy_violation"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let webhook_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["retry_attempts"], json!(3));

    // Listed.
    let response = create_router(state.clone())
        .oneshot(get("/webhooks"))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], json!(1));

    // Deliveries empty but routable.
    let response = create_router(state.clone())
        .oneshot(get(&format!("/webhooks/{webhook_id}/deliveries")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total"], json!(0));

    // Delete.
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/webhooks/{webhook_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = create_router(state)
        .oneshot(get(&format!("/webhooks/{webhook_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_recent_analyses_after_check() {
    let state = build_test_state().await;
    let hcl = r#"resource "aws_instance" "x" { instance_type = "t3.medium" }"#;
    create_router(state.clone())
        .oneshot(post(
            "/mcp/checkCostImpact",
            json!({
                "iac_type": "terraform",
                "iac_payload": encode(hcl),
                "environment": "prod"
            }),
        ))
        .await
        .unwrap();

    let response = create_router(state)
        .oneshot(post("/mcp/listRecentAnalyses", json!({"limit": 5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["summary"], "monthly=30.37 resources=1");
}

#[tokio::test]
async fn audit_captures_api_requests() {
    let state = build_test_state().await;

    // A policy read generates one api.request event; /healthz is excluded.
    create_router(state.clone())
        .oneshot(get("/mcp/policies"))
        .await
        .unwrap();
    create_router(state.clone())
        .oneshot(get("/healthz"))
        .await
        .unwrap();

    let response = create_router(state)
        .oneshot(post(
            "/audit/query",
            json!({"event_types": ["api.request"]}),
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["action"], "GET /mcp/policies");
    assert_eq!(events[0]["http"]["status"], json!(200));
}

#[tokio::test]
async fn compliance_report_round_trip() {
    let state = build_test_state().await;
    create_router(state.clone())
        .oneshot(get("/mcp/policies"))
        .await
        .unwrap();

    let start = chrono::Utc::now() - chrono::Duration::hours(1);
    let end = chrono::Utc::now() + chrono::Duration::hours(1);
    let response = create_router(state)
        .oneshot(post(
            "/audit/compliance-report",
            json!({"start_time": start, "end_time": end}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["compliance_status"], "compliant");
    assert_eq!(body["total_api_requests"], json!(1));
    assert_eq!(body["policy_compliance_rate"], json!(100.0));
}

#[tokio::test]
async fn suggest_optimizations_returns_empty_list() {
    let router = create_router(build_test_state().await);
    let response = router
        .oneshot(post("/mcp/suggestOptimizations", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["suggestions"], json!([]));
}
