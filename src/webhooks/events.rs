//! Webhook event emission: builds event payloads, routes them to subscribed
//! webhooks, and derives anomaly events from analysis results.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::domain::webhook::{WebhookEvent, WebhookEventType};
use crate::storage::WebhookStore;

use super::delivery::WebhookDeliveryService;

/// Breakdown items above this monthly cost raise `high_cost_resource`.
pub const HIGH_COST_RESOURCE_THRESHOLD: f64 = 1000.0;

/// Cost increases above this percentage raise `cost_spike`.
pub const COST_SPIKE_THRESHOLD_PERCENT: f64 = 50.0;

/// Creates and fans out webhook events.
pub struct WebhookEventService {
    store: Arc<WebhookStore>,
    delivery: WebhookDeliveryService,
}

impl WebhookEventService {
    pub fn new(store: Arc<WebhookStore>) -> Self {
        let delivery = WebhookDeliveryService::new(store.clone());
        Self { store, delivery }
    }

    pub fn delivery_service(&self) -> &WebhookDeliveryService {
        &self.delivery
    }

    /// Send one event to every enabled webhook subscribed to its type.
    /// Deliveries fan out concurrently.
    pub async fn send_event(&self, event: WebhookEvent) {
        let webhooks = self.store.webhooks_for_event(event.event_type).await;
        if webhooks.is_empty() {
            debug!(event_type = %event.event_type, "no webhooks subscribed");
            return;
        }

        info!(
            event_type = %event.event_type,
            webhooks = webhooks.len(),
            "sending webhook event"
        );

        let attempts = webhooks
            .iter()
            .map(|webhook| self.delivery.deliver_event(webhook, &event));
        let results = futures::future::join_all(attempts).await;

        let delivered = results.iter().filter(|&&ok| ok).count();
        info!(
            event_type = %event.event_type,
            delivered,
            total = results.len(),
            "webhook delivery completed"
        );
    }

    pub async fn send_cost_anomaly_event(
        &self,
        analysis: &Value,
        anomaly: Value,
        environment: &str,
    ) {
        let data = json!({
            "environment": environment,
            "analysis": analysis,
            "anomaly": anomaly,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::CostAnomaly, data))
            .await;
    }

    pub async fn send_budget_exceeded_event(
        &self,
        budget_limit: f64,
        actual_cost: f64,
        analysis: &Value,
        environment: &str,
    ) {
        let data = json!({
            "environment": environment,
            "budget_limit": budget_limit,
            "actual_cost": actual_cost,
            "overage": actual_cost - budget_limit,
            "overage_percentage": (actual_cost - budget_limit) / budget_limit * 100.0,
            "analysis": analysis,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::BudgetExceeded, data))
            .await;
    }

    pub async fn send_policy_violation_event(
        &self,
        violations: &Value,
        analysis: &Value,
        environment: &str,
        violation_type: &str,
    ) {
        let data = json!({
            "environment": environment,
            "violation_type": violation_type,
            "violations": violations,
            "analysis": analysis,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::PolicyViolation, data))
            .await;
    }

    pub async fn send_high_cost_resource_event(
        &self,
        resource: &Value,
        analysis: &Value,
        environment: &str,
    ) {
        let data = json!({
            "environment": environment,
            "resource": resource,
            "cost_threshold": HIGH_COST_RESOURCE_THRESHOLD,
            "monthly_cost": resource.get("monthly_cost").cloned().unwrap_or(json!(0)),
            "analysis": analysis,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::HighCostResource, data))
            .await;
    }

    pub async fn send_cost_spike_event(
        &self,
        current_cost: f64,
        previous_cost: f64,
        spike_percentage: f64,
        analysis: &Value,
        environment: &str,
    ) {
        let data = json!({
            "environment": environment,
            "current_cost": current_cost,
            "previous_cost": previous_cost,
            "spike_percentage": spike_percentage,
            "cost_increase": current_cost - previous_cost,
            "analysis": analysis,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::CostSpike, data))
            .await;
    }

    pub async fn send_analysis_completed_event(
        &self,
        analysis: &Value,
        environment: &str,
        duration_ms: i64,
    ) {
        let data = json!({
            "environment": environment,
            "duration_ms": duration_ms,
            "analysis": analysis,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::AnalysisCompleted, data))
            .await;
    }

    pub async fn send_policy_created_event(&self, policy: &Value, created_by: &str) {
        let data = json!({
            "policy": policy,
            "created_by": created_by,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::PolicyCreated, data))
            .await;
    }

    pub async fn send_policy_updated_event(&self, policy: &Value, updated_by: &str) {
        let data = json!({
            "policy": policy,
            "updated_by": updated_by,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::PolicyUpdated, data))
            .await;
    }

    pub async fn send_policy_deleted_event(&self, policy_id: &str, policy_name: &str, deleted_by: &str) {
        let data = json!({
            "policy_id": policy_id,
            "policy_name": policy_name,
            "deleted_by": deleted_by,
            "timestamp": Utc::now(),
        });
        self.send_event(WebhookEvent::new(WebhookEventType::PolicyDeleted, data))
            .await;
    }

    /// Inspect an analysis result and emit every applicable event:
    /// budget_exceeded, cost_spike, high_cost_resource, policy_violation,
    /// and always analysis_completed, in that order.
    pub async fn detect_cost_anomalies(
        &self,
        analysis: &Value,
        previous_cost: Option<f64>,
        environment: &str,
    ) {
        let current_cost = analysis
            .get("estimated_monthly_cost")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        if let Some(budget_limit) = analysis.get("budget_limit").and_then(Value::as_f64) {
            if current_cost > budget_limit {
                self.send_budget_exceeded_event(budget_limit, current_cost, analysis, environment)
                    .await;
            }
        }

        if let Some(previous_cost) = previous_cost {
            if previous_cost > 0.0 {
                let spike_percentage = (current_cost - previous_cost) / previous_cost * 100.0;
                if spike_percentage > COST_SPIKE_THRESHOLD_PERCENT {
                    self.send_cost_spike_event(
                        current_cost,
                        previous_cost,
                        spike_percentage,
                        analysis,
                        environment,
                    )
                    .await;
                }
            }
        }

        if let Some(breakdown) = analysis.get("breakdown_by_resource").and_then(Value::as_array) {
            for resource in breakdown {
                let monthly_cost = resource
                    .get("monthly_cost")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                if monthly_cost > HIGH_COST_RESOURCE_THRESHOLD {
                    self.send_high_cost_resource_event(resource, analysis, environment)
                        .await;
                }
            }
        }

        if let Some(policy_eval) = analysis.get("policy_eval") {
            let blocking = policy_eval.get("blocking_violations").and_then(Value::as_array);
            if let Some(blocking) = blocking {
                if !blocking.is_empty() {
                    self.send_policy_violation_event(
                        &json!(blocking),
                        analysis,
                        environment,
                        "blocking",
                    )
                    .await;
                }
            }
            let advisory = policy_eval.get("advisory_violations").and_then(Value::as_array);
            if let Some(advisory) = advisory {
                if !advisory.is_empty() {
                    self.send_policy_violation_event(
                        &json!(advisory),
                        analysis,
                        environment,
                        "advisory",
                    )
                    .await;
                }
            }
        }

        let duration_ms = analysis
            .get("duration_ms")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        self.send_analysis_completed_event(analysis, environment, duration_ms)
            .await;
    }
}

/// Fire-and-forget wrapper used by the orchestrator; failures are logged,
/// never propagated to the analysis caller.
pub fn spawn_anomaly_detection(
    events: Arc<WebhookEventService>,
    analysis: Value,
    previous_cost: Option<f64>,
    environment: String,
) {
    tokio::spawn(async move {
        let result = std::panic::AssertUnwindSafe(async {
            events
                .detect_cost_anomalies(&analysis, previous_cost, &environment)
                .await;
        });
        if let Err(err) = futures::FutureExt::catch_unwind(result).await {
            error!(?err, "anomaly detection task panicked");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::WebhookStore;

    #[tokio::test]
    async fn test_send_event_with_no_subscribers_is_noop() {
        let store = Arc::new(WebhookStore::in_memory().await);
        let events = WebhookEventService::new(store.clone());
        events
            .send_event(WebhookEvent::new(
                WebhookEventType::AnalysisCompleted,
                json!({}),
            ))
            .await;
        // No deliveries created.
        assert!(store.list_webhooks().await.is_empty());
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(HIGH_COST_RESOURCE_THRESHOLD, 1000.0);
        assert_eq!(COST_SPIKE_THRESHOLD_PERCENT, 50.0);
    }
}
