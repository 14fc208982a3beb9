//! Integration tests for webhook delivery against a mock HTTP receiver.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use finopsguard::domain::webhook::{
    WebhookCreateRequest, WebhookEvent, WebhookEventType, WebhookStatus,
};
use finopsguard::storage::WebhookStore;
use finopsguard::webhooks::{sign_payload, WebhookDeliveryService, WebhookEventService};
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn webhook_request(url: String, events: Vec<WebhookEventType>) -> WebhookCreateRequest {
    WebhookCreateRequest {
        id: None,
        name: "ci-alerts".to_string(),
        description: None,
        url,
        secret: None,
        events,
        enabled: true,
        verify_ssl: true,
        timeout_seconds: 5,
        retry_attempts: 3,
        retry_delay_seconds: 7,
        headers: None,
    }
}

#[tokio::test]
async fn successful_delivery_transitions_to_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("user-agent", "FinOpsGuard-Webhook/1.0"))
        .and(header("x-webhook-event", "high_cost_resource"))
        .and(header_exists("x-webhook-delivery"))
        .and(header("x-webhook-attempt", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let webhook = webhook_request(
        format!("{}/hook", server.uri()),
        vec![WebhookEventType::HighCostResource],
    )
    .into_webhook()
    .unwrap();
    store.create_webhook(webhook.clone()).await;

    let delivery_service = WebhookDeliveryService::new(store.clone());
    let event = WebhookEvent::new(
        WebhookEventType::HighCostResource,
        json!({"resource_id": "gpu-fleet", "monthly_cost": 1500.0}),
    );
    assert!(delivery_service.deliver_event(&webhook, &event).await);

    let deliveries = store.list_deliveries(&webhook.id, 10).await;
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.status, WebhookStatus::Delivered);
    assert_eq!(delivery.attempt_number, 1);
    assert_eq!(delivery.response_status, Some(200));
    assert_eq!(delivery.response_body.as_deref(), Some("ok"));
    assert!(delivery.delivered_at.is_some());
}

#[tokio::test]
async fn http_503_schedules_retry_with_delay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let webhook = webhook_request(server.uri(), vec![WebhookEventType::HighCostResource])
        .into_webhook()
        .unwrap();
    store.create_webhook(webhook.clone()).await;

    let delivery_service = WebhookDeliveryService::new(store.clone());
    let event = WebhookEvent::new(WebhookEventType::HighCostResource, json!({}));
    let before = Utc::now();
    assert!(!delivery_service.deliver_event(&webhook, &event).await);

    let delivery = &store.list_deliveries(&webhook.id, 10).await[0];
    assert_eq!(delivery.status, WebhookStatus::Retrying);
    assert_eq!(delivery.response_status, Some(503));
    let next_retry = delivery.next_retry_at.unwrap();
    let delta = (next_retry - before).num_seconds();
    // retry_delay_seconds is 7; allow slack for the round trip.
    assert!((6..=9).contains(&delta), "unexpected retry delay: {delta}s");
}

#[tokio::test]
async fn exhausted_attempts_mark_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let mut request = webhook_request(server.uri(), vec![WebhookEventType::CostSpike]);
    request.retry_attempts = 2;
    let webhook = request.into_webhook().unwrap();
    store.create_webhook(webhook.clone()).await;

    let delivery_service = WebhookDeliveryService::new(store.clone());
    let event = WebhookEvent::new(WebhookEventType::CostSpike, json!({}));
    delivery_service.deliver_event(&webhook, &event).await;

    let mut delivery = store.list_deliveries(&webhook.id, 10).await[0].clone();
    assert_eq!(delivery.status, WebhookStatus::Retrying);

    // Second (final) attempt exhausts max_attempts.
    assert!(!delivery_service.retry_delivery(&webhook, &mut delivery).await);
    assert_eq!(delivery.attempt_number, 2);
    assert_eq!(delivery.status, WebhookStatus::Failed);
    assert!(delivery.next_retry_at.is_none());

    // Terminal states do not transition.
    assert!(!delivery_service.retry_delivery(&webhook, &mut delivery).await);
    assert_eq!(delivery.status, WebhookStatus::Failed);
}

#[tokio::test]
async fn hmac_signature_verifies_against_received_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("x-webhook-signature"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let mut request = webhook_request(server.uri(), vec![WebhookEventType::BudgetExceeded]);
    request.secret = Some("s".to_string());
    let webhook = request.into_webhook().unwrap();
    store.create_webhook(webhook.clone()).await;

    let delivery_service = WebhookDeliveryService::new(store.clone());
    let event = WebhookEvent::new(WebhookEventType::BudgetExceeded, json!({"limit": 100}));
    assert!(delivery_service.deliver_event(&webhook, &event).await);

    // Recompute the signature over the exact received bytes; it must match
    // the header the dispatcher sent.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let request = &received[0];
    let header_value = request
        .headers
        .get("x-webhook-signature")
        .expect("signature header present")
        .to_str()
        .unwrap();
    let expected = format!("sha256={}", sign_payload("s", &request.body));
    assert_eq!(header_value, expected);
}

#[tokio::test]
async fn custom_headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-team", "platform"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let mut request = webhook_request(server.uri(), vec![WebhookEventType::CostAnomaly]);
    request.headers = Some(HashMap::from([("X-Team".to_string(), "platform".to_string())]));
    let webhook = request.into_webhook().unwrap();
    store.create_webhook(webhook.clone()).await;

    let delivery_service = WebhookDeliveryService::new(store.clone());
    let event = WebhookEvent::new(WebhookEventType::CostAnomaly, json!({}));
    assert!(delivery_service.deliver_event(&webhook, &event).await);
}

#[tokio::test]
async fn anomaly_detection_fans_out_expected_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    // One webhook subscribed to everything the detector can emit.
    let webhook = webhook_request(
        server.uri(),
        vec![
            WebhookEventType::BudgetExceeded,
            WebhookEventType::HighCostResource,
            WebhookEventType::PolicyViolation,
            WebhookEventType::AnalysisCompleted,
            WebhookEventType::CostSpike,
        ],
    )
    .into_webhook()
    .unwrap();
    store.create_webhook(webhook.clone()).await;

    let events = WebhookEventService::new(store.clone());
    let analysis = json!({
        "estimated_monthly_cost": 2500.0,
        "budget_limit": 2000.0,
        "breakdown_by_resource": [
            {"resource_id": "gpu-fleet", "monthly_cost": 1500.0},
            {"resource_id": "cheap", "monthly_cost": 3.0}
        ],
        "policy_eval": {
            "blocking_violations": [{"policy_id": "no_large_instances_in_dev"}],
            "advisory_violations": []
        },
        "duration_ms": 12
    });
    // Previous cost 1000 -> 150% increase triggers the spike event.
    events
        .detect_cost_anomalies(&analysis, Some(1000.0), "dev")
        .await;

    let deliveries = store.list_deliveries(&webhook.id, 50).await;
    let mut event_types: Vec<&str> = deliveries
        .iter()
        .map(|delivery| delivery.event_type.as_str())
        .collect();
    event_types.sort_unstable();
    assert_eq!(
        event_types,
        vec![
            "analysis_completed",
            "budget_exceeded",
            "cost_spike",
            "high_cost_resource",
            "policy_violation",
        ]
    );
    for delivery in &deliveries {
        assert_eq!(delivery.status, WebhookStatus::Delivered);
        assert_eq!(delivery.attempt_number, 1);
        assert!(delivery.attempt_number <= delivery.max_attempts);
    }
}

#[tokio::test]
async fn event_routing_skips_unsubscribed_webhooks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(WebhookStore::in_memory().await);
    let subscribed = webhook_request(server.uri(), vec![WebhookEventType::CostSpike])
        .into_webhook()
        .unwrap();
    let other = webhook_request(server.uri(), vec![WebhookEventType::PolicyDeleted])
        .into_webhook()
        .unwrap();
    store.create_webhook(subscribed.clone()).await;
    store.create_webhook(other.clone()).await;

    let events = WebhookEventService::new(store.clone());
    events
        .send_cost_spike_event(300.0, 100.0, 200.0, &json!({}), "prod")
        .await;

    assert_eq!(store.list_deliveries(&subscribed.id, 10).await.len(), 1);
    assert!(store.list_deliveries(&other.id, 10).await.is_empty());
}
