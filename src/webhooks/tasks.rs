//! Background webhook processing: the periodic retry scan and the daily
//! cleanup of old delivery records.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::WebhookConfig;
use crate::domain::webhook::WebhookStatus;
use crate::storage::WebhookStore;

use super::delivery::WebhookDeliveryService;

/// Pause between items within one retry batch.
const INTER_ITEM_PAUSE: Duration = Duration::from_millis(100);

/// Local hour at which the daily cleanup pass runs.
const CLEANUP_HOUR: u32 = 2;

/// Owns the background retry loop. Started at process startup, aborted at
/// shutdown.
pub struct WebhookTaskService {
    store: Arc<WebhookStore>,
    delivery: Arc<WebhookDeliveryService>,
    config: WebhookConfig,
    handle: Option<JoinHandle<()>>,
}

impl WebhookTaskService {
    pub fn new(store: Arc<WebhookStore>, config: WebhookConfig) -> Self {
        let delivery = Arc::new(WebhookDeliveryService::new(store.clone()));
        Self {
            store,
            delivery,
            config,
            handle: None,
        }
    }

    /// Spawn the retry processor as a detached task.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("webhook retry processor is already running");
            return;
        }

        let store = self.store.clone();
        let delivery = self.delivery.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(config.retry_interval_seconds.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;

                let processed =
                    process_due_deliveries(&store, &delivery, config.retry_batch_size).await;
                if processed > 0 {
                    info!(processed, "processed webhook retries");
                }

                if Local::now().hour() == CLEANUP_HOUR {
                    let removed = store
                        .cleanup_old_deliveries(config.cleanup_after_days)
                        .await;
                    if removed > 0 {
                        info!(removed, "cleaned up old webhook deliveries");
                    }
                }
            }
        });

        self.handle = Some(handle);
        info!(
            interval_seconds = self.config.retry_interval_seconds,
            "started webhook retry processor"
        );
    }

    /// Cancel the background task.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("stopped webhook retry processor");
        }
    }

    /// Run one retry batch immediately; used by tests and admin tooling.
    pub async fn process_once(&self) -> usize {
        process_due_deliveries(&self.store, &self.delivery, self.config.retry_batch_size).await
    }
}

impl Drop for WebhookTaskService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Re-attempt due deliveries, oldest first. Returns how many succeeded.
async fn process_due_deliveries(
    store: &Arc<WebhookStore>,
    delivery_service: &Arc<WebhookDeliveryService>,
    batch_size: usize,
) -> usize {
    let due = store.due_deliveries(Utc::now(), batch_size).await;
    if due.is_empty() {
        return 0;
    }

    info!(count = due.len(), "retrying pending webhook deliveries");

    let mut success_count = 0;
    for mut delivery in due {
        match store.get_webhook(&delivery.webhook_id).await {
            Some(webhook) if webhook.enabled => {
                if delivery_service.retry_delivery(&webhook, &mut delivery).await {
                    success_count += 1;
                }
            }
            _ => {
                // Disabled or deleted subscriptions fail their deliveries.
                delivery.status = WebhookStatus::Failed;
                delivery.error_message = Some("Webhook is disabled".to_string());
                delivery.next_retry_at = None;
                store.update_delivery(&delivery).await;
                error!(
                    delivery_id = %delivery.id,
                    webhook_id = %delivery.webhook_id,
                    "failing delivery for disabled webhook"
                );
            }
        }
        tokio::time::sleep(INTER_ITEM_PAUSE).await;
    }

    success_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::{WebhookCreateRequest, WebhookDelivery, WebhookEvent, WebhookEventType};
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_webhook_fails_delivery() {
        let store = Arc::new(WebhookStore::in_memory().await);
        let mut webhook = WebhookCreateRequest {
            id: Some("hook".to_string()),
            name: "n".to_string(),
            description: None,
            url: "https://unused.example.com".to_string(),
            secret: None,
            events: vec![WebhookEventType::AnalysisCompleted],
            enabled: true,
            verify_ssl: true,
            timeout_seconds: 1,
            retry_attempts: 3,
            retry_delay_seconds: 1,
            headers: None,
        }
        .into_webhook()
        .unwrap();
        store.create_webhook(webhook.clone()).await;

        let event = WebhookEvent::new(WebhookEventType::AnalysisCompleted, json!({}));
        let mut delivery = WebhookDelivery::new(&webhook, &event);
        delivery.status = WebhookStatus::Retrying;
        let delivery_id = delivery.id.clone();
        store.create_delivery(delivery).await;

        webhook.enabled = false;
        store.update_webhook(webhook).await;

        let delivery_service = Arc::new(WebhookDeliveryService::new(store.clone()));
        let succeeded = process_due_deliveries(&store, &delivery_service, 10).await;
        assert_eq!(succeeded, 0);

        let stored = store.get_delivery(&delivery_id).await.unwrap();
        assert_eq!(stored.status, WebhookStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("Webhook is disabled"));
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let store = Arc::new(WebhookStore::in_memory().await);
        let mut tasks = WebhookTaskService::new(
            store,
            WebhookConfig {
                retry_interval_seconds: 3600,
                retry_batch_size: 10,
                cleanup_after_days: 30,
            },
        );
        tasks.start();
        tasks.start();
        tasks.stop();
        tasks.stop();
    }
}
