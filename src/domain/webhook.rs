use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::{FinOpsError, Result};

/// Supported webhook event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CostAnomaly,
    BudgetExceeded,
    PolicyViolation,
    HighCostResource,
    CostSpike,
    AnalysisCompleted,
    PolicyCreated,
    PolicyUpdated,
    PolicyDeleted,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CostAnomaly => "cost_anomaly",
            Self::BudgetExceeded => "budget_exceeded",
            Self::PolicyViolation => "policy_violation",
            Self::HighCostResource => "high_cost_resource",
            Self::CostSpike => "cost_spike",
            Self::AnalysisCompleted => "analysis_completed",
            Self::PolicyCreated => "policy_created",
            Self::PolicyUpdated => "policy_updated",
            Self::PolicyDeleted => "policy_deleted",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery lifecycle states. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Pending,
    Delivered,
    Failed,
    Retrying,
}

impl WebhookStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }
}

/// Header names a webhook subscription may not override.
const RESERVED_HEADERS: [&str; 4] = ["content-type", "content-length", "authorization", "user-agent"];

/// A webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub events: Vec<WebhookEventType>,
    pub enabled: bool,
    pub verify_ssl: bool,
    pub timeout_seconds: u64,
    pub retry_attempts: i32,
    pub retry_delay_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn subscribes_to(&self, event_type: WebhookEventType) -> bool {
        self.events.contains(&event_type)
    }
}

/// Request to create a webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub events: Vec<WebhookEventType>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: i32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> i32 {
    3
}

fn default_retry_delay() -> i64 {
    5
}

/// Validate a webhook URL and header set.
pub fn validate_webhook_config(url: &str, headers: Option<&HashMap<String, String>>) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(FinOpsError::validation(
            "URL must start with http:// or https://",
        ));
    }
    if let Some(headers) = headers {
        for name in headers.keys() {
            if RESERVED_HEADERS.contains(&name.to_lowercase().as_str()) {
                return Err(FinOpsError::validation(format!(
                    "Header \"{}\" is reserved and cannot be used",
                    name
                )));
            }
        }
    }
    Ok(())
}

impl WebhookCreateRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(FinOpsError::validation("name must not be empty"));
        }
        if self.events.is_empty() {
            return Err(FinOpsError::validation("at least one event is required"));
        }
        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(FinOpsError::validation("timeout_seconds must be in 1..=300"));
        }
        if !(1..=10).contains(&self.retry_attempts) {
            return Err(FinOpsError::validation("retry_attempts must be in 1..=10"));
        }
        if !(1..=3600).contains(&self.retry_delay_seconds) {
            return Err(FinOpsError::validation(
                "retry_delay_seconds must be in 1..=3600",
            ));
        }
        validate_webhook_config(&self.url, self.headers.as_ref())
    }

    pub fn into_webhook(self) -> Result<Webhook> {
        self.validate()?;
        let now = Utc::now();
        Ok(Webhook {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: self.name,
            description: self.description,
            url: self.url,
            secret: self.secret,
            events: self.events,
            enabled: self.enabled,
            verify_ssl: self.verify_ssl,
            timeout_seconds: self.timeout_seconds,
            retry_attempts: self.retry_attempts,
            retry_delay_seconds: self.retry_delay_seconds,
            headers: self.headers,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a webhook subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<WebhookEventType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl WebhookUpdateRequest {
    /// Apply this update onto an existing webhook, re-validating the result.
    pub fn apply(self, webhook: &mut Webhook) -> Result<()> {
        if let Some(name) = self.name {
            webhook.name = name;
        }
        if let Some(description) = self.description {
            webhook.description = Some(description);
        }
        if let Some(url) = self.url {
            webhook.url = url;
        }
        if let Some(secret) = self.secret {
            webhook.secret = Some(secret);
        }
        if let Some(events) = self.events {
            if events.is_empty() {
                return Err(FinOpsError::validation("at least one event is required"));
            }
            webhook.events = events;
        }
        if let Some(enabled) = self.enabled {
            webhook.enabled = enabled;
        }
        if let Some(verify_ssl) = self.verify_ssl {
            webhook.verify_ssl = verify_ssl;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            webhook.timeout_seconds = timeout_seconds;
        }
        if let Some(retry_attempts) = self.retry_attempts {
            webhook.retry_attempts = retry_attempts;
        }
        if let Some(retry_delay_seconds) = self.retry_delay_seconds {
            webhook.retry_delay_seconds = retry_delay_seconds;
        }
        if let Some(headers) = self.headers {
            webhook.headers = Some(headers);
        }
        validate_webhook_config(&webhook.url, webhook.headers.as_ref())?;
        webhook.updated_at = Utc::now();
        Ok(())
    }
}

/// One webhook event instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: WebhookEventType,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl WebhookEvent {
    pub fn new(event_type: WebhookEventType, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            data,
            metadata: None,
        }
    }
}

/// A single delivery record with its own state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: String,
    pub webhook_id: String,
    pub event_id: String,
    pub event_type: WebhookEventType,
    pub payload: Value,
    pub status: WebhookStatus,
    pub attempt_number: i32,
    pub max_attempts: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl WebhookDelivery {
    pub fn new(webhook: &Webhook, event: &WebhookEvent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            webhook_id: webhook.id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type,
            payload: serde_json::to_value(event).unwrap_or(Value::Null),
            status: WebhookStatus::Pending,
            attempt_number: 1,
            max_attempts: webhook.retry_attempts,
            next_retry_at: None,
            response_status: None,
            response_body: None,
            error_message: None,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }

    pub fn attempts_remaining(&self) -> bool {
        self.attempt_number < self.max_attempts
    }
}

/// Request to test-fire a webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookTestRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<WebhookEventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
}

/// Result of a webhook test fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTestResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request() -> WebhookCreateRequest {
        WebhookCreateRequest {
            id: None,
            name: "ci-alerts".to_string(),
            description: None,
            url: "https://hooks.example.com/finops".to_string(),
            secret: Some("s3cret".to_string()),
            events: vec![WebhookEventType::BudgetExceeded],
            enabled: true,
            verify_ssl: true,
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            headers: None,
        }
    }

    #[test]
    fn test_url_scheme_validation() {
        let mut req = create_request();
        req.url = "ftp://example.com".to_string();
        assert!(req.validate().is_err());
        req.url = "http://example.com".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_reserved_headers_rejected() {
        let mut req = create_request();
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer x".to_string());
        req.headers = Some(headers);
        assert!(req.validate().is_err());

        let mut headers = HashMap::new();
        headers.insert("X-Team".to_string(), "platform".to_string());
        req.headers = Some(headers);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_defaults() {
        let body = json!({
            "name": "n",
            "url": "https://example.com",
            "events": ["analysis_completed"]
        });
        let req: WebhookCreateRequest = serde_json::from_value(body).unwrap();
        assert!(req.enabled);
        assert!(req.verify_ssl);
        assert_eq!(req.timeout_seconds, 30);
        assert_eq!(req.retry_attempts, 3);
        assert_eq!(req.retry_delay_seconds, 5);
    }

    #[test]
    fn test_delivery_initial_state() {
        let webhook = create_request().into_webhook().unwrap();
        let event = WebhookEvent::new(WebhookEventType::BudgetExceeded, json!({"x": 1}));
        let delivery = WebhookDelivery::new(&webhook, &event);
        assert_eq!(delivery.status, WebhookStatus::Pending);
        assert_eq!(delivery.attempt_number, 1);
        assert_eq!(delivery.max_attempts, 3);
        assert!(delivery.attempts_remaining());
    }

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&WebhookEventType::HighCostResource).unwrap(),
            "\"high_cost_resource\""
        );
        assert_eq!(WebhookEventType::PolicyDeleted.as_str(), "policy_deleted");
    }

    #[test]
    fn test_terminal_states() {
        assert!(WebhookStatus::Delivered.is_terminal());
        assert!(WebhookStatus::Failed.is_terminal());
        assert!(!WebhookStatus::Retrying.is_terminal());
        assert!(!WebhookStatus::Pending.is_terminal());
    }

    #[test]
    fn test_update_revalidates_url() {
        let mut webhook = create_request().into_webhook().unwrap();
        let update = WebhookUpdateRequest {
            url: Some("not-a-url".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&mut webhook).is_err());
    }
}
