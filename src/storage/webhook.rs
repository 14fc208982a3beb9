//! Hybrid webhook store: subscriptions and delivery records, in-memory with
//! an optional durable table behind them.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::webhook::{Webhook, WebhookDelivery, WebhookEventType, WebhookStatus};

use super::database::DatabasePool;

/// Storage for webhook subscriptions and their delivery records.
pub struct WebhookStore {
    webhooks: RwLock<Vec<Webhook>>,
    deliveries: RwLock<Vec<WebhookDelivery>>,
    database: Option<DatabasePool>,
}

impl WebhookStore {
    pub async fn new(database: Option<DatabasePool>) -> Self {
        let store = Self {
            webhooks: RwLock::new(Vec::new()),
            deliveries: RwLock::new(Vec::new()),
            database,
        };
        store.load_from_database().await;
        store
    }

    pub async fn in_memory() -> Self {
        Self::new(None).await
    }

    async fn load_from_database(&self) {
        let Some(database) = &self.database else { return };

        match sqlx::query("SELECT body FROM webhooks")
            .fetch_all(database.pool())
            .await
        {
            Ok(rows) => {
                let mut webhooks = self.webhooks.write().await;
                for row in rows {
                    let body: String = row.get("body");
                    if let Ok(webhook) = serde_json::from_str::<Webhook>(&body) {
                        webhooks.push(webhook);
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to load webhooks from database"),
        }

        match sqlx::query("SELECT body FROM webhook_deliveries")
            .fetch_all(database.pool())
            .await
        {
            Ok(rows) => {
                let mut deliveries = self.deliveries.write().await;
                for row in rows {
                    let body: String = row.get("body");
                    if let Ok(delivery) = serde_json::from_str::<WebhookDelivery>(&body) {
                        deliveries.push(delivery);
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to load webhook deliveries from database"),
        }
    }

    async fn persist_webhook(&self, webhook: &Webhook) {
        let Some(database) = &self.database else { return };
        let Ok(body) = serde_json::to_string(webhook) else { return };
        let result = sqlx::query(
            "INSERT INTO webhooks (id, body, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(&webhook.id)
        .bind(&body)
        .bind(webhook.updated_at.to_rfc3339())
        .execute(database.pool())
        .await;
        if let Err(err) = result {
            warn!(error = %err, webhook_id = %webhook.id, "failed to persist webhook");
        }
    }

    async fn persist_delivery(&self, delivery: &WebhookDelivery) {
        let Some(database) = &self.database else { return };
        let Ok(body) = serde_json::to_string(delivery) else { return };
        let result = sqlx::query(
            "INSERT INTO webhook_deliveries (id, webhook_id, status, next_retry_at, created_at, body) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, \
             next_retry_at = excluded.next_retry_at, body = excluded.body",
        )
        .bind(&delivery.id)
        .bind(&delivery.webhook_id)
        .bind(delivery.status.as_str())
        .bind(delivery.next_retry_at.map(|t| t.to_rfc3339()))
        .bind(delivery.created_at.to_rfc3339())
        .bind(&body)
        .execute(database.pool())
        .await;
        if let Err(err) = result {
            warn!(error = %err, delivery_id = %delivery.id, "failed to persist delivery");
        }
    }

    // --- webhooks ---

    pub async fn create_webhook(&self, webhook: Webhook) {
        self.persist_webhook(&webhook).await;
        self.webhooks.write().await.push(webhook);
    }

    pub async fn update_webhook(&self, webhook: Webhook) -> bool {
        let updated = {
            let mut webhooks = self.webhooks.write().await;
            match webhooks.iter_mut().find(|w| w.id == webhook.id) {
                Some(existing) => {
                    *existing = webhook.clone();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist_webhook(&webhook).await;
        }
        updated
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> bool {
        let mut webhooks = self.webhooks.write().await;
        let before = webhooks.len();
        webhooks.retain(|w| w.id != webhook_id);
        let removed = webhooks.len() < before;
        drop(webhooks);

        if removed {
            if let Some(database) = &self.database {
                if let Err(err) = sqlx::query("DELETE FROM webhooks WHERE id = ?")
                    .bind(webhook_id)
                    .execute(database.pool())
                    .await
                {
                    warn!(error = %err, webhook_id, "failed to delete stored webhook");
                }
            }
        }
        removed
    }

    pub async fn get_webhook(&self, webhook_id: &str) -> Option<Webhook> {
        self.webhooks
            .read()
            .await
            .iter()
            .find(|w| w.id == webhook_id)
            .cloned()
    }

    pub async fn list_webhooks(&self) -> Vec<Webhook> {
        self.webhooks.read().await.clone()
    }

    /// Enabled webhooks subscribed to an event type.
    pub async fn webhooks_for_event(&self, event_type: WebhookEventType) -> Vec<Webhook> {
        self.webhooks
            .read()
            .await
            .iter()
            .filter(|w| w.enabled && w.subscribes_to(event_type))
            .cloned()
            .collect()
    }

    // --- deliveries ---

    pub async fn create_delivery(&self, delivery: WebhookDelivery) {
        self.persist_delivery(&delivery).await;
        self.deliveries.write().await.push(delivery);
    }

    /// Replace a delivery record by id.
    pub async fn update_delivery(&self, delivery: &WebhookDelivery) {
        {
            let mut deliveries = self.deliveries.write().await;
            if let Some(existing) = deliveries.iter_mut().find(|d| d.id == delivery.id) {
                *existing = delivery.clone();
            }
        }
        self.persist_delivery(delivery).await;
    }

    pub async fn get_delivery(&self, delivery_id: &str) -> Option<WebhookDelivery> {
        self.deliveries
            .read()
            .await
            .iter()
            .find(|d| d.id == delivery_id)
            .cloned()
    }

    /// Deliveries for one webhook, newest first.
    pub async fn list_deliveries(&self, webhook_id: &str, limit: usize) -> Vec<WebhookDelivery> {
        let mut deliveries: Vec<WebhookDelivery> = self
            .deliveries
            .read()
            .await
            .iter()
            .filter(|d| d.webhook_id == webhook_id)
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        deliveries.truncate(limit);
        deliveries
    }

    /// Deliveries due for a retry: pending or retrying, next_retry_at
    /// elapsed (or never set), attempts remaining. Oldest first.
    pub async fn due_deliveries(&self, now: DateTime<Utc>, batch_size: usize) -> Vec<WebhookDelivery> {
        let mut due: Vec<WebhookDelivery> = self
            .deliveries
            .read()
            .await
            .iter()
            .filter(|d| {
                matches!(d.status, WebhookStatus::Pending | WebhookStatus::Retrying)
                    && d.attempts_remaining()
                    && d.next_retry_at.map(|t| t <= now).unwrap_or(true)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(batch_size);
        due
    }

    /// Delete terminal deliveries older than the cutoff. Returns how many
    /// were removed from memory.
    pub async fn cleanup_old_deliveries(&self, days_to_keep: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let mut deliveries = self.deliveries.write().await;
        let before = deliveries.len();
        deliveries.retain(|d| !(d.status.is_terminal() && d.created_at < cutoff));
        let removed = before - deliveries.len();
        drop(deliveries);

        if let Some(database) = &self.database {
            let result = sqlx::query(
                "DELETE FROM webhook_deliveries WHERE created_at < ? \
                 AND status IN ('delivered', 'failed')",
            )
            .bind(cutoff.to_rfc3339())
            .execute(database.pool())
            .await;
            if let Err(err) = result {
                warn!(error = %err, "failed to clean up stored deliveries");
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::{WebhookCreateRequest, WebhookEvent};
    use serde_json::json;

    async fn store_with_webhook(events: Vec<WebhookEventType>) -> (WebhookStore, Webhook) {
        let store = WebhookStore::in_memory().await;
        let webhook = WebhookCreateRequest {
            id: None,
            name: "alerts".to_string(),
            description: None,
            url: "https://hooks.example.com/x".to_string(),
            secret: None,
            events,
            enabled: true,
            verify_ssl: true,
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            headers: None,
        }
        .into_webhook()
        .unwrap();
        store.create_webhook(webhook.clone()).await;
        (store, webhook)
    }

    #[tokio::test]
    async fn test_event_routing_respects_enabled_and_subscription() {
        let (store, webhook) = store_with_webhook(vec![WebhookEventType::BudgetExceeded]).await;
        assert_eq!(
            store
                .webhooks_for_event(WebhookEventType::BudgetExceeded)
                .await
                .len(),
            1
        );
        assert!(store
            .webhooks_for_event(WebhookEventType::CostSpike)
            .await
            .is_empty());

        let mut disabled = webhook.clone();
        disabled.enabled = false;
        assert!(store.update_webhook(disabled).await);
        assert!(store
            .webhooks_for_event(WebhookEventType::BudgetExceeded)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_due_deliveries_filtering() {
        let (store, webhook) = store_with_webhook(vec![WebhookEventType::AnalysisCompleted]).await;
        let event = WebhookEvent::new(WebhookEventType::AnalysisCompleted, json!({}));

        let mut due_now = WebhookDelivery::new(&webhook, &event);
        due_now.status = WebhookStatus::Retrying;
        due_now.next_retry_at = Some(Utc::now() - Duration::seconds(5));

        let mut not_yet = WebhookDelivery::new(&webhook, &event);
        not_yet.status = WebhookStatus::Retrying;
        not_yet.next_retry_at = Some(Utc::now() + Duration::seconds(300));

        let mut exhausted = WebhookDelivery::new(&webhook, &event);
        exhausted.status = WebhookStatus::Retrying;
        exhausted.attempt_number = 3;

        let mut terminal = WebhookDelivery::new(&webhook, &event);
        terminal.status = WebhookStatus::Delivered;

        let due_id = due_now.id.clone();
        for delivery in [due_now, not_yet, exhausted, terminal] {
            store.create_delivery(delivery).await;
        }

        let due = store.due_deliveries(Utc::now(), 10).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, due_id);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_terminal() {
        let (store, webhook) = store_with_webhook(vec![WebhookEventType::AnalysisCompleted]).await;
        let event = WebhookEvent::new(WebhookEventType::AnalysisCompleted, json!({}));

        let mut old_delivered = WebhookDelivery::new(&webhook, &event);
        old_delivered.status = WebhookStatus::Delivered;
        old_delivered.created_at = Utc::now() - Duration::days(40);

        let mut old_retrying = WebhookDelivery::new(&webhook, &event);
        old_retrying.status = WebhookStatus::Retrying;
        old_retrying.created_at = Utc::now() - Duration::days(40);

        let fresh = WebhookDelivery::new(&webhook, &event);

        for delivery in [old_delivered, old_retrying, fresh] {
            store.create_delivery(delivery).await;
        }

        assert_eq!(store.cleanup_old_deliveries(30).await, 1);
        assert_eq!(store.list_deliveries(&webhook.id, 10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_durable_webhook_round_trip() {
        let database = DatabasePool::connect_in_memory().await.unwrap();
        let store = WebhookStore::new(Some(database.clone())).await;
        let webhook = WebhookCreateRequest {
            id: Some("hook-1".to_string()),
            name: "alerts".to_string(),
            description: None,
            url: "https://hooks.example.com/x".to_string(),
            secret: None,
            events: vec![WebhookEventType::PolicyViolation],
            enabled: true,
            verify_ssl: true,
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            headers: None,
        }
        .into_webhook()
        .unwrap();
        store.create_webhook(webhook).await;

        let reloaded = WebhookStore::new(Some(database)).await;
        assert!(reloaded.get_webhook("hook-1").await.is_some());
    }
}
