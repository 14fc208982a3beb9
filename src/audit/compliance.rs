//! Compliance reporting over the audit log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    AuditEventType, AuditQuery, AuditSeverity, ComplianceReport, ComplianceStatus,
};
use crate::storage::AuditStore;

/// Aggregates audit events into a compliance report.
pub struct ComplianceEngine {
    store: Arc<AuditStore>,
}

impl ComplianceEngine {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    /// Generate a report for `[start, end]`.
    pub async fn generate_report(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> ComplianceReport {
        let response = self
            .store
            .query_events(&AuditQuery {
                start_time: Some(start_time),
                end_time: Some(end_time),
                limit: 10_000,
                ..Default::default()
            })
            .await;
        let events = response.events;

        let total_events = events.len();
        let mut total_api_requests = 0;
        let mut total_policy_evaluations = 0;
        let mut total_policy_violations = 0;
        let mut total_auth_attempts = 0;
        let mut failed_auth_attempts = 0;
        let mut security_violations = 0;
        let mut blocked_requests = 0;

        let mut events_by_type: HashMap<String, usize> = HashMap::new();
        let mut events_by_severity: HashMap<String, usize> = HashMap::new();
        let mut events_by_user: HashMap<String, usize> = HashMap::new();
        let mut policy_violations = Vec::new();
        let mut critical_events = Vec::new();

        for event in &events {
            *events_by_type
                .entry(event.event_type.as_str().to_string())
                .or_default() += 1;
            *events_by_severity
                .entry(event.severity.as_str().to_string())
                .or_default() += 1;
            *events_by_user.entry(event.actor_key()).or_default() += 1;

            match event.event_type {
                AuditEventType::ApiRequest => {
                    total_api_requests += 1;
                    let status = event.http.as_ref().and_then(|http| http.status);
                    if !event.success || status.map(|s| s >= 400).unwrap_or(false) {
                        blocked_requests += 1;
                    }
                }
                AuditEventType::PolicyEvaluated => total_policy_evaluations += 1,
                AuditEventType::PolicyViolated => {
                    total_policy_violations += 1;
                    policy_violations.push(json!({
                        "timestamp": event.timestamp.to_rfc3339(),
                        "policy_id": event.resource_id,
                        "policy_name": event.details.get("policy_name").cloned(),
                        "user": event.actor_key(),
                        "environment": event.details.get("environment").cloned(),
                    }));
                }
                AuditEventType::AuthLogin | AuditEventType::AuthFailed => {
                    total_auth_attempts += 1;
                    if !event.success {
                        failed_auth_attempts += 1;
                    }
                }
                AuditEventType::SecurityViolation => security_violations += 1,
                _ => {}
            }

            if event.severity == AuditSeverity::Critical {
                critical_events.push(event.clone());
            }
        }

        let policy_compliance_rate = if total_policy_evaluations > 0 {
            (total_policy_evaluations - total_policy_violations.min(total_policy_evaluations))
                as f64
                / total_policy_evaluations as f64
                * 100.0
        } else {
            100.0
        };

        let authentication_success_rate = if total_auth_attempts > 0 {
            (total_auth_attempts - failed_auth_attempts) as f64 / total_auth_attempts as f64 * 100.0
        } else {
            100.0
        };

        let mut top_users: Vec<(String, usize)> = events_by_user
            .iter()
            .map(|(user, &count)| (user.clone(), count))
            .collect();
        top_users.sort_by(|a, b| b.1.cmp(&a.1));
        let top_users = top_users
            .into_iter()
            .take(10)
            .map(|(user, count)| json!({"user": user, "event_count": count}))
            .collect();

        let mut compliance_status = ComplianceStatus::Compliant;
        let mut compliance_notes = Vec::new();

        if total_policy_violations > 0 {
            compliance_status = ComplianceStatus::Review;
            compliance_notes.push(format!("{total_policy_violations} policy violations detected"));
        }
        if total_auth_attempts > 0
            && failed_auth_attempts as f64 > total_auth_attempts as f64 * 0.1
        {
            compliance_status = ComplianceStatus::Review;
            compliance_notes.push("High authentication failure rate".to_string());
        }
        if security_violations > 0 {
            compliance_status = ComplianceStatus::NonCompliant;
            compliance_notes.push(format!("{security_violations} security violations detected"));
        }

        policy_violations.truncate(100);
        critical_events.truncate(50);

        ComplianceReport {
            report_id: Uuid::new_v4().simple().to_string(),
            generated_at: Utc::now(),
            start_time,
            end_time,
            total_events,
            total_api_requests,
            total_policy_evaluations,
            total_policy_violations,
            total_auth_attempts,
            failed_auth_attempts,
            events_by_type,
            events_by_severity,
            events_by_user,
            security_violations,
            blocked_requests,
            policy_compliance_rate,
            authentication_success_rate,
            top_users,
            policy_violations,
            critical_events,
            compliance_status,
            compliance_notes,
        }
    }
}
