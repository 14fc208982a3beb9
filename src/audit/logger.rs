//! Audit logging with three independent best-effort sinks: a JSON-lines
//! file, the structured logger, and the durable store.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::AuditConfig;
use crate::domain::{AuditActor, AuditEvent, AuditEventType, AuditSeverity};
use crate::storage::AuditStore;

/// Captures security-relevant events for compliance and monitoring.
/// A failure in any single sink never blocks the call.
pub struct AuditLogger {
    enabled: bool,
    file_path: Option<PathBuf>,
    console_logging: bool,
    db_logging: bool,
    store: Arc<AuditStore>,
}

impl AuditLogger {
    pub fn new(config: &AuditConfig, store: Arc<AuditStore>) -> Self {
        let file_path = if config.log_file.is_empty() {
            None
        } else {
            let path = PathBuf::from(&config.log_file);
            if let Some(parent) = path.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    warn!(error = %err, "could not create audit log directory, file sink disabled");
                }
            }
            Some(path)
        };

        Self {
            enabled: config.enabled,
            file_path,
            console_logging: config.console_logging,
            db_logging: config.db_logging,
            store,
        }
    }

    /// Logger suitable for tests: console-only, in-memory store.
    pub fn for_tests() -> Self {
        Self {
            enabled: true,
            file_path: None,
            console_logging: false,
            db_logging: true,
            store: Arc::new(AuditStore::in_memory()),
        }
    }

    pub fn store(&self) -> &Arc<AuditStore> {
        &self.store
    }

    /// Record an event on every enabled sink. Returns `None` when auditing
    /// is disabled.
    pub async fn log_event(&self, event: AuditEvent) -> Option<AuditEvent> {
        if !self.enabled {
            return None;
        }

        if self.file_path.is_some() {
            self.log_to_file(&event);
        }
        if self.console_logging {
            self.log_to_console(&event);
        }
        if self.db_logging {
            self.store.store_event(event.clone()).await;
        }

        Some(event)
    }

    fn log_to_file(&self, event: &AuditEvent) {
        let Some(path) = &self.file_path else { return };
        let entry = json!({
            "event_id": event.event_id,
            "timestamp": event.timestamp.to_rfc3339(),
            "event_type": event.event_type.as_str(),
            "severity": event.severity.as_str(),
            "user": event.actor_key(),
            "action": event.action,
            "success": event.success,
            "ip_address": event.actor.ip_address,
            "resource": event.resource_type.as_ref().map(|resource_type| {
                format!("{}:{}", resource_type, event.resource_id.as_deref().unwrap_or(""))
            }),
            "details": event.details,
            "error": event.error_message,
        });

        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{entry}"));
        if let Err(err) = result {
            error!(error = %err, "error writing audit log to file");
        }
    }

    fn log_to_console(&self, event: &AuditEvent) {
        let message = format!(
            "[AUDIT] {} | User: {} | Action: {} | Success: {}",
            event.event_type.as_str(),
            event.actor_key(),
            event.action,
            event.success
        );
        match event.severity {
            AuditSeverity::Critical | AuditSeverity::Error => error!("{message}"),
            AuditSeverity::Warning => warn!("{message}"),
            _ => info!("{message}"),
        }
    }

    /// One `api.request` event per HTTP request.
    pub async fn log_api_request(
        &self,
        method: &str,
        path: &str,
        status: u16,
        duration_ms: u64,
        actor: AuditActor,
        request_id: &str,
    ) -> Option<AuditEvent> {
        let event = AuditEvent::new(AuditEventType::ApiRequest, format!("{method} {path}"))
            .with_severity(AuditSeverity::from_http_status(status))
            .with_actor(actor)
            .with_request_id(request_id)
            .with_http(method, path, Some(status))
            .with_details(json!({"duration_ms": duration_ms}))
            .with_success(status < 400)
            .tagged(&["api_access"]);
        self.log_event(event).await
    }

    /// Authentication attempt, success or failure.
    pub async fn log_authentication(
        &self,
        username: &str,
        success: bool,
        ip_address: Option<String>,
        auth_method: &str,
        error_message: Option<String>,
    ) -> Option<AuditEvent> {
        let mut event = AuditEvent::new(
            if success {
                AuditEventType::AuthLogin
            } else {
                AuditEventType::AuthFailed
            },
            format!("Authentication via {auth_method}"),
        )
        .with_severity(if success {
            AuditSeverity::Info
        } else {
            AuditSeverity::Warning
        })
        .with_details(json!({"auth_method": auth_method}))
        .tagged(&["authentication"]);
        event.actor.username = Some(username.to_string());
        event.actor.ip_address = ip_address;
        event.success = success;
        event.error_message = error_message;
        self.log_event(event).await
    }

    /// Policy evaluation summary for an analysis.
    pub async fn log_policy_evaluation(
        &self,
        environment: &str,
        overall_status: &str,
        blocking: usize,
        advisory: usize,
    ) -> Option<AuditEvent> {
        let event = AuditEvent::new(
            AuditEventType::PolicyEvaluated,
            format!("Policy evaluation: {overall_status}"),
        )
        .with_details(json!({
            "environment": environment,
            "overall_status": overall_status,
            "blocking_violations": blocking,
            "advisory_violations": advisory,
        }))
        .tagged(&["policy_evaluation"]);
        self.log_event(event).await
    }

    /// A specific policy violation.
    pub async fn log_policy_violation(
        &self,
        policy_id: &str,
        policy_name: &str,
        environment: Option<&str>,
        details: Value,
    ) -> Option<AuditEvent> {
        let event = AuditEvent::new(
            AuditEventType::PolicyViolated,
            format!("Policy violation: {policy_name}"),
        )
        .with_severity(AuditSeverity::Warning)
        .with_resource("policy", policy_id)
        .with_success(false)
        .with_details(json!({
            "policy_id": policy_id,
            "policy_name": policy_name,
            "environment": environment,
            "details": details,
        }))
        .tagged(&["policy_violation", "compliance"]);
        self.log_event(event).await
    }

    /// A policy create/update/delete.
    pub async fn log_policy_change(
        &self,
        policy_id: &str,
        policy_name: &str,
        change_type: &str,
        username: Option<&str>,
    ) -> Option<AuditEvent> {
        let event_type = match change_type {
            "created" => AuditEventType::PolicyCreated,
            "deleted" => AuditEventType::PolicyDeleted,
            _ => AuditEventType::PolicyUpdated,
        };
        let mut event = AuditEvent::new(
            event_type,
            format!("Policy {change_type}: {policy_name}"),
        )
        .with_resource("policy", policy_id)
        .with_details(json!({
            "policy_id": policy_id,
            "policy_name": policy_name,
            "change_type": change_type,
        }))
        .tagged(&["policy_change", "configuration"]);
        event.actor.username = username.map(str::to_string);
        self.log_event(event).await
    }

    /// A completed analysis.
    pub async fn log_analysis(
        &self,
        request_id: &str,
        environment: &str,
        monthly_cost: f64,
        duration_ms: i64,
    ) -> Option<AuditEvent> {
        let event = AuditEvent::new(AuditEventType::AnalysisCreated, "Cost analysis completed")
            .with_resource("analysis", request_id)
            .with_details(json!({
                "environment": environment,
                "estimated_monthly_cost": monthly_cost,
                "duration_ms": duration_ms,
            }))
            .tagged(&["analysis"]);
        self.log_event(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditQuery;

    #[tokio::test]
    async fn test_disabled_logger_returns_none() {
        let config = AuditConfig {
            enabled: false,
            log_file: String::new(),
            console_logging: false,
            db_logging: true,
        };
        let logger = AuditLogger::new(&config, Arc::new(AuditStore::in_memory()));
        let event = AuditEvent::new(AuditEventType::ApiRequest, "GET /healthz");
        assert!(logger.log_event(event).await.is_none());
    }

    #[tokio::test]
    async fn test_db_sink_receives_events() {
        let logger = AuditLogger::for_tests();
        logger
            .log_api_request("POST", "/mcp/checkCostImpact", 200, 12, AuditActor::default(), "req-1")
            .await
            .unwrap();
        let response = logger.store().query_events(&AuditQuery::default()).await;
        assert_eq!(response.total_count, 1);
        assert_eq!(response.events[0].http.as_ref().unwrap().status, Some(200));
    }

    #[tokio::test]
    async fn test_file_sink_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: true,
            log_file: file.to_string_lossy().to_string(),
            console_logging: false,
            db_logging: false,
        };
        let logger = AuditLogger::new(&config, Arc::new(AuditStore::in_memory()));

        logger
            .log_authentication("alice", false, Some("10.0.0.1".to_string()), "api_key", None)
            .await;
        logger
            .log_policy_change("p1", "Budget", "created", Some("alice"))
            .await;

        let contents = std::fs::read_to_string(&file).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event_type"], "auth.failed");
        assert_eq!(first["user"], "alice");
        assert_eq!(first["success"], false);
    }

    #[tokio::test]
    async fn test_auth_failure_severity() {
        let logger = AuditLogger::for_tests();
        let event = logger
            .log_authentication("bob", false, None, "jwt", Some("expired token".to_string()))
            .await
            .unwrap();
        assert_eq!(event.severity, AuditSeverity::Warning);
        assert_eq!(event.event_type, AuditEventType::AuthFailed);
    }
}
