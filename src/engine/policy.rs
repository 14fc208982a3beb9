//! Policy evaluation engine: builds the evaluation context and runs every
//! applicable policy, promoting `resource.*` policies to per-resource scope.

use serde_json::{json, Map, Value};

use crate::domain::policy::{
    OverallStatus, Policy, PolicyEvaluationResult, PolicyStatus, PolicyViolation,
    PolicyViolationAction,
};
use crate::domain::{CanonicalResourceModel, CheckResponse};
use crate::storage::SharedPolicyStore;

/// Evaluates stored and ad-hoc policies against an analysis.
pub struct PolicyEngine {
    store: SharedPolicyStore,
}

impl PolicyEngine {
    pub fn new(store: SharedPolicyStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedPolicyStore {
        &self.store
    }

    /// Evaluate all enabled policies plus any custom ones against the
    /// analysis. The check response must be fully computed before this is
    /// called.
    pub async fn evaluate_policies(
        &self,
        model: &CanonicalResourceModel,
        response: &CheckResponse,
        environment: &str,
        custom_policies: &[Policy],
    ) -> PolicyEvaluationResult {
        let context = build_evaluation_context(model, response, environment);

        let mut policies = self.store.enabled_policies().await;
        policies.extend(custom_policies.iter().cloned());

        let mut blocking_violations = Vec::new();
        let mut advisory_violations = Vec::new();
        let mut passed_policies = Vec::new();

        for policy in &policies {
            if policy.expression.is_some() && policy.is_resource_scoped() {
                let violations = evaluate_resource_scoped(policy, &context);
                if violations.is_empty() {
                    passed_policies.push(policy.id.clone());
                } else {
                    match policy.on_violation {
                        PolicyViolationAction::Block => blocking_violations.extend(violations),
                        PolicyViolationAction::Advisory => advisory_violations.extend(violations),
                    }
                }
            } else {
                let outcome = policy.evaluate(&context);
                if outcome.status == PolicyStatus::Fail {
                    let violation = PolicyViolation {
                        policy_id: outcome.policy_id,
                        policy_name: outcome.policy_name,
                        reason: outcome.reason,
                        violation_details: outcome.violation_details,
                        resource_id: None,
                    };
                    match policy.on_violation {
                        PolicyViolationAction::Block => blocking_violations.push(violation),
                        PolicyViolationAction::Advisory => advisory_violations.push(violation),
                    }
                } else {
                    passed_policies.push(policy.id.clone());
                }
            }
        }

        let overall_status = if !blocking_violations.is_empty() {
            OverallStatus::Block
        } else if !advisory_violations.is_empty() {
            OverallStatus::Advisory
        } else {
            OverallStatus::Pass
        };

        PolicyEvaluationResult {
            overall_status,
            blocking_violations,
            advisory_violations,
            passed_policies,
            evaluation_context: context,
        }
    }
}

/// Evaluate a resource-scoped policy once per resource; each failing
/// resource becomes its own violation.
fn evaluate_resource_scoped(policy: &Policy, context: &Value) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();
    let Some(resources) = context.get("resources").and_then(Value::as_array) else {
        return violations;
    };

    for resource in resources {
        let mut scoped = context.clone();
        if let Value::Object(map) = &mut scoped {
            map.insert("resource".to_string(), resource.clone());
        }

        let outcome = policy.evaluate(&scoped);
        if outcome.status == PolicyStatus::Fail {
            let resource_id = resource
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            violations.push(PolicyViolation {
                policy_id: outcome.policy_id,
                policy_name: outcome.policy_name,
                reason: outcome
                    .reason
                    .map(|reason| format!("{reason} (resource: {resource_id})")),
                violation_details: outcome.violation_details,
                resource_id: Some(resource_id),
            });
        }
    }

    violations
}

/// Build the JSON context tree policies evaluate against.
pub fn build_evaluation_context(
    model: &CanonicalResourceModel,
    response: &CheckResponse,
    environment: &str,
) -> Value {
    let mut resources = Vec::with_capacity(model.resources.len());
    for resource in &model.resources {
        let mut entry = Map::new();
        entry.insert("id".to_string(), json!(resource.id));
        entry.insert("type".to_string(), json!(resource.resource_type));
        entry.insert("name".to_string(), json!(resource.name));
        entry.insert("region".to_string(), json!(resource.region));
        entry.insert("size".to_string(), json!(resource.size));
        entry.insert("count".to_string(), json!(resource.count));
        entry.insert(
            "tags".to_string(),
            serde_json::to_value(resource.tags.clone().unwrap_or_default()).unwrap_or(json!({})),
        );
        entry.insert(
            "metadata".to_string(),
            serde_json::to_value(resource.metadata.clone().unwrap_or_default()).unwrap_or(json!({})),
        );

        if let Some(item) = response
            .breakdown_by_resource
            .iter()
            .find(|item| item.resource_id == resource.id)
        {
            entry.insert("monthly_cost".to_string(), json!(item.monthly_cost));
            entry.insert("cost_notes".to_string(), json!(item.notes));
        }

        resources.push(Value::Object(entry));
    }

    let mut resource_type_counts: Map<String, Value> = Map::new();
    let mut region_counts: Map<String, Value> = Map::new();
    for resource in &model.resources {
        let type_entry = resource_type_counts
            .entry(resource.resource_type.clone())
            .or_insert(json!(0));
        *type_entry = json!(type_entry.as_i64().unwrap_or(0) + resource.count);
        let region_entry = region_counts
            .entry(resource.region.clone())
            .or_insert(json!(0));
        *region_entry = json!(region_entry.as_i64().unwrap_or(0) + resource.count);
    }

    json!({
        "environment": environment,
        "estimated_monthly_cost": response.estimated_monthly_cost,
        "estimated_first_week_cost": response.estimated_first_week_cost,
        "pricing_confidence": response.pricing_confidence,
        "risk_flags": response.risk_flags,
        "total_resources": model.resources.len(),
        "resources": resources,
        "resource_type_counts": resource_type_counts,
        "region_counts": region_counts,
    })
}
