//! Analysis orchestration: validate → decode → parse → simulate → evaluate
//! → persist → notify. Only validation errors surface to the caller; every
//! other failure is recovered locally.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::audit::AuditLogger;
use crate::cache::AnalysisCache;
use crate::domain::policy::{OverallStatus, Policy, PolicyEvaluationResult};
use crate::domain::{
    CanonicalResourceModel, CheckRequest, CheckResponse, FinOpsError, PolicyEvalStatus,
    PolicyEvaluation, Result,
};
use crate::parsers;
use crate::storage::{AnalysisRecord, AnalysisStore};
use crate::webhooks::{spawn_anomaly_detection, WebhookEventService};

use super::policy::PolicyEngine;
use super::simulation::simulate_cost;

static SUMMARY_MONTHLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"monthly=([0-9.]+)").expect("valid regex"));

/// Drives a single cost-impact analysis end to end.
pub struct AnalysisOrchestrator {
    policy_engine: PolicyEngine,
    analysis_store: Arc<AnalysisStore>,
    cache: AnalysisCache,
    webhook_events: Arc<WebhookEventService>,
    audit: Arc<AuditLogger>,
}

impl AnalysisOrchestrator {
    pub fn new(
        policy_engine: PolicyEngine,
        analysis_store: Arc<AnalysisStore>,
        cache: AnalysisCache,
        webhook_events: Arc<WebhookEventService>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            policy_engine,
            analysis_store,
            cache,
            webhook_events,
            audit,
        }
    }

    pub fn policy_engine(&self) -> &PolicyEngine {
        &self.policy_engine
    }

    pub fn analysis_store(&self) -> &Arc<AnalysisStore> {
        &self.analysis_store
    }

    /// Run a cost impact check. Synchronous to the caller; webhook events
    /// are dispatched on a detached task.
    pub async fn check_cost_impact(&self, request: &CheckRequest) -> Result<CheckResponse> {
        let started = Instant::now();

        if request.iac_payload.is_empty() {
            return Err(FinOpsError::invalid_request("iac_payload is required"));
        }

        let budget_limit = request
            .budget_rules
            .as_ref()
            .and_then(|rules| rules.get("monthly_budget"))
            .copied();

        // Full-analysis cache: a hit skips the pipeline and side effects.
        let response_key = AnalysisCache::request_key(
            request.iac_type.as_str(),
            &request.iac_payload,
            request.environment.as_str(),
            budget_limit,
        );
        if let Some(mut cached) = self.cache.get_response(&response_key).await {
            cached.duration_ms = elapsed_ms(started);
            info!("analysis served from cache");
            return Ok(cached);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&request.iac_payload)
            .map_err(|_| FinOpsError::InvalidPayloadEncoding)?;
        let payload_text =
            String::from_utf8(decoded).map_err(|_| FinOpsError::InvalidPayloadEncoding)?;

        let model = self.parse_cached(request.iac_type.as_str(), &payload_text).await;
        let mut response = self.simulate_cached(&model).await;

        // An inline budget rule becomes an ephemeral advisory policy.
        let mut custom_policies = Vec::new();
        if let Some(budget) = budget_limit {
            let mut policy = Policy::budget("request_budget", "Request Budget Rule", budget);
            policy.description = Some("Budget rule from request".to_string());
            custom_policies.push(policy);
        }

        let evaluation = self
            .policy_engine
            .evaluate_policies(&model, &response, request.environment.as_str(), &custom_policies)
            .await;
        merge_policy_result(&mut response, &evaluation);
        response.duration_ms = elapsed_ms(started);

        self.record_side_effects(request, &response, &evaluation, budget_limit)
            .await;

        self.cache.put_response(&response_key, &response).await;

        Ok(response)
    }

    async fn parse_cached(&self, iac_type: &str, payload_text: &str) -> CanonicalResourceModel {
        let key = AnalysisCache::payload_key(iac_type, payload_text);
        if let Some(model) = self.cache.get_model(&key).await {
            return model;
        }
        let format = match iac_type {
            "terraform" => crate::domain::IacType::Terraform,
            "ansible" => crate::domain::IacType::Ansible,
            _ => {
                warn!(iac_type, "no parser for IaC type, returning empty model");
                return CanonicalResourceModel::empty();
            }
        };
        let model = parsers::parse(payload_text, format);
        self.cache.put_model(&key, &model).await;
        model
    }

    async fn simulate_cached(&self, model: &CanonicalResourceModel) -> CheckResponse {
        let key = AnalysisCache::model_key(model);
        if let Some(response) = self.cache.get_cost(&key).await {
            return response;
        }
        let response = simulate_cost(model);
        self.cache.put_cost(&key, &response).await;
        response
    }

    async fn record_side_effects(
        &self,
        request: &CheckRequest,
        response: &CheckResponse,
        evaluation: &PolicyEvaluationResult,
        budget_limit: Option<f64>,
    ) {
        let environment = request.environment.as_str();
        let request_id = chrono::Utc::now().timestamp_millis().to_string();
        let summary = format!(
            "monthly={:.2} resources={}",
            response.estimated_monthly_cost,
            response.breakdown_by_resource.len()
        );

        // The previous analysis cost feeds cost-spike detection.
        let previous_cost = self
            .analysis_store
            .most_recent()
            .await
            .and_then(|record| parse_summary_monthly(&record.summary));

        let analysis_data = build_analysis_payload(response, evaluation, budget_limit);
        self.analysis_store
            .add_analysis(
                AnalysisRecord::new(&request_id, response.duration_ms, &summary),
                Some(&analysis_data),
            )
            .await;

        self.audit
            .log_analysis(
                &request_id,
                environment,
                response.estimated_monthly_cost,
                response.duration_ms,
            )
            .await;
        let status = match evaluation.overall_status {
            OverallStatus::Pass => "pass",
            OverallStatus::Advisory => "advisory",
            OverallStatus::Block => "block",
        };
        self.audit
            .log_policy_evaluation(
                environment,
                status,
                evaluation.blocking_violations.len(),
                evaluation.advisory_violations.len(),
            )
            .await;
        for (violation, severity) in evaluation
            .blocking_violations
            .iter()
            .map(|violation| (violation, "blocking"))
            .chain(
                evaluation
                    .advisory_violations
                    .iter()
                    .map(|violation| (violation, "advisory")),
            )
        {
            crate::metrics::record_policy_violation(&violation.policy_id, severity);
            self.audit
                .log_policy_violation(
                    &violation.policy_id,
                    &violation.policy_name,
                    Some(environment),
                    violation.violation_details.clone().unwrap_or(Value::Null),
                )
                .await;
        }
        crate::metrics::record_analysis(environment, status);

        spawn_anomaly_detection(
            self.webhook_events.clone(),
            analysis_data,
            previous_cost,
            environment.to_string(),
        );
    }
}

/// Apply the aggregate policy verdict to the response, per the precedence
/// block > advisory > pass.
fn merge_policy_result(response: &mut CheckResponse, evaluation: &PolicyEvaluationResult) {
    match evaluation.overall_status {
        OverallStatus::Block => {
            response.risk_flags.push("policy_blocked".to_string());
            response.policy_eval = Some(PolicyEvaluation {
                status: PolicyEvalStatus::Fail,
                policy_id: Some("multiple_policies".to_string()),
                reason: Some(format!(
                    "Blocking policy violations: {}",
                    evaluation.blocking_violations.len()
                )),
            });
        }
        OverallStatus::Advisory => {
            response.risk_flags.push("policy_advisory".to_string());
            response.policy_eval = Some(PolicyEvaluation {
                status: PolicyEvalStatus::Pass,
                policy_id: Some("multiple_policies".to_string()),
                reason: Some(format!(
                    "Advisory violations: {}",
                    evaluation.advisory_violations.len()
                )),
            });
        }
        OverallStatus::Pass => {
            response.policy_eval = Some(PolicyEvaluation {
                status: PolicyEvalStatus::Pass,
                policy_id: Some("all_policies".to_string()),
                reason: Some("All policies satisfied".to_string()),
            });
        }
    }
}

/// The analysis payload handed to the anomaly detector and the durable
/// store: the response plus the full policy evaluation and any budget
/// limit from the request.
fn build_analysis_payload(
    response: &CheckResponse,
    evaluation: &PolicyEvaluationResult,
    budget_limit: Option<f64>,
) -> Value {
    let mut analysis = serde_json::to_value(response).unwrap_or(json!({}));
    if let Value::Object(map) = &mut analysis {
        map.insert(
            "policy_eval".to_string(),
            json!({
                "overall_status": evaluation.overall_status,
                "blocking_violations": evaluation.blocking_violations,
                "advisory_violations": evaluation.advisory_violations,
                "passed_policies": evaluation.passed_policies,
            }),
        );
        if let Some(budget) = budget_limit {
            map.insert("budget_limit".to_string(), json!(budget));
        }
    }
    analysis
}

fn elapsed_ms(started: Instant) -> i64 {
    (started.elapsed().as_millis() as i64).max(1)
}

fn parse_summary_monthly(summary: &str) -> Option<f64> {
    SUMMARY_MONTHLY
        .captures(summary)
        .and_then(|captures| captures[1].parse().ok())
}
