use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Types of audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    #[serde(rename = "auth.login")]
    AuthLogin,
    #[serde(rename = "auth.logout")]
    AuthLogout,
    #[serde(rename = "auth.failed")]
    AuthFailed,
    #[serde(rename = "api.request")]
    ApiRequest,
    #[serde(rename = "api.error")]
    ApiError,
    #[serde(rename = "policy.created")]
    PolicyCreated,
    #[serde(rename = "policy.updated")]
    PolicyUpdated,
    #[serde(rename = "policy.deleted")]
    PolicyDeleted,
    #[serde(rename = "policy.evaluated")]
    PolicyEvaluated,
    #[serde(rename = "policy.violated")]
    PolicyViolated,
    #[serde(rename = "analysis.created")]
    AnalysisCreated,
    #[serde(rename = "analysis.viewed")]
    AnalysisViewed,
    #[serde(rename = "config.changed")]
    ConfigChanged,
    #[serde(rename = "data.exported")]
    DataExported,
    #[serde(rename = "security.violation")]
    SecurityViolation,
    #[serde(rename = "system.start")]
    SystemStart,
    #[serde(rename = "system.stop")]
    SystemStop,
    #[serde(rename = "system.error")]
    SystemError,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthLogin => "auth.login",
            Self::AuthLogout => "auth.logout",
            Self::AuthFailed => "auth.failed",
            Self::ApiRequest => "api.request",
            Self::ApiError => "api.error",
            Self::PolicyCreated => "policy.created",
            Self::PolicyUpdated => "policy.updated",
            Self::PolicyDeleted => "policy.deleted",
            Self::PolicyEvaluated => "policy.evaluated",
            Self::PolicyViolated => "policy.violated",
            Self::AnalysisCreated => "analysis.created",
            Self::AnalysisViewed => "analysis.viewed",
            Self::ConfigChanged => "config.changed",
            Self::DataExported => "data.exported",
            Self::SecurityViolation => "security.violation",
            Self::SystemStart => "system.start",
            Self::SystemStop => "system.stop",
            Self::SystemError => "system.error",
        }
    }
}

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Severity for an HTTP status class: 2xx/3xx info, 4xx warning, 5xx error.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            500.. => Self::Error,
            400..=499 => Self::Warning,
            _ => Self::Info,
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditActor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// HTTP request context attached to API events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditHttpContext {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub actor: AuditActor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub details: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<AuditHttpContext>,
    #[serde(default)]
    pub compliance_tags: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, action: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().simple().to_string(),
            event_type,
            severity: AuditSeverity::Info,
            timestamp: Utc::now(),
            actor: AuditActor::default(),
            request_id: None,
            action: action.into(),
            resource_type: None,
            resource_id: None,
            details: Value::Object(Default::default()),
            success: true,
            error_message: None,
            http: None,
            compliance_tags: Vec::new(),
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_actor(mut self, actor: AuditActor) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error.into());
        self
    }

    pub fn with_http(mut self, method: impl Into<String>, path: impl Into<String>, status: Option<u16>) -> Self {
        self.http = Some(AuditHttpContext {
            method: method.into(),
            path: path.into(),
            status,
        });
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.compliance_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Identity used for per-user aggregation: username, user id, or anonymous.
    pub fn actor_key(&self) -> String {
        self.actor
            .username
            .clone()
            .or_else(|| self.actor.user_id.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Sort order for audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSortField {
    Timestamp,
    Severity,
}

/// Filters for retrieving audit logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<AuditEventType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severities: Option<Vec<AuditSeverity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usernames: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_sort_by")]
    pub sort_by: AuditSortField,
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
}

fn default_limit() -> usize {
    100
}

fn default_sort_by() -> AuditSortField {
    AuditSortField::Timestamp
}

fn default_sort_order() -> SortOrder {
    SortOrder::Desc
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            event_types: None,
            severities: None,
            usernames: None,
            resource_types: None,
            success: None,
            search_term: None,
            limit: default_limit(),
            offset: 0,
            sort_by: default_sort_by(),
            sort_order: default_sort_order(),
        }
    }
}

/// Response for audit log queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    pub total_count: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

/// Compliance report over a time window of audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_events: usize,
    pub total_api_requests: usize,
    pub total_policy_evaluations: usize,
    pub total_policy_violations: usize,
    pub total_auth_attempts: usize,
    pub failed_auth_attempts: usize,
    pub events_by_type: HashMap<String, usize>,
    pub events_by_severity: HashMap<String, usize>,
    pub events_by_user: HashMap<String, usize>,
    pub security_violations: usize,
    pub blocked_requests: usize,
    pub policy_compliance_rate: f64,
    pub authentication_success_rate: f64,
    pub top_users: Vec<Value>,
    pub policy_violations: Vec<Value>,
    pub critical_events: Vec<AuditEvent>,
    pub compliance_status: ComplianceStatus,
    pub compliance_notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Review,
}
