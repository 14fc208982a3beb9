use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happens when a policy is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyViolationAction {
    Advisory,
    Block,
}

impl Default for PolicyViolationAction {
    fn default() -> Self {
        Self::Advisory
    }
}

/// Comparison operators supported by policy rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
}

/// A single rule: dotted field path, operator, comparison value.
///
/// The field path is resolved at evaluation time against a JSON value tree,
/// descending maps by key and lists by numeric index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub field: String,
    pub operator: PolicyOperator,
    pub value: Value,
}

impl PolicyRule {
    pub fn new(field: impl Into<String>, operator: PolicyOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluate the rule against a context tree.
    pub fn evaluate(&self, context: &Value) -> bool {
        let field_value = resolve_path(context, &self.field);

        match self.operator {
            PolicyOperator::Eq => value_eq(field_value, &self.value),
            PolicyOperator::Ne => !value_eq(field_value, &self.value),
            PolicyOperator::Gt => compare_numeric(field_value, &self.value, |a, b| a > b),
            PolicyOperator::Gte => compare_numeric(field_value, &self.value, |a, b| a >= b),
            PolicyOperator::Lt => compare_numeric(field_value, &self.value, |a, b| a < b),
            PolicyOperator::Lte => compare_numeric(field_value, &self.value, |a, b| a <= b),
            PolicyOperator::In => match &self.value {
                Value::Array(items) => items.iter().any(|item| value_eq(field_value, item)),
                _ => false,
            },
            PolicyOperator::Contains => {
                let haystack = stringify(field_value).to_lowercase();
                let needle = stringify(Some(&self.value)).to_lowercase();
                haystack.contains(&needle)
            }
            PolicyOperator::StartsWith => {
                stringify(field_value).starts_with(&stringify(Some(&self.value)))
            }
            PolicyOperator::EndsWith => {
                stringify(field_value).ends_with(&stringify(Some(&self.value)))
            }
        }
    }
}

/// Walk a dotted path through maps and numeric-indexed lists.
fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(items) => {
                let index: usize = part.parse().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Equality with cross-type numeric comparison (1 == 1.0).
fn value_eq(field_value: Option<&Value>, expected: &Value) -> bool {
    match field_value {
        None => expected.is_null(),
        Some(actual) => {
            if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
                return a == b;
            }
            actual == expected
        }
    }
}

/// Numeric comparison; coercion failure makes the rule false. A missing
/// field coerces to 0, matching the source DSL.
fn compare_numeric(field_value: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    let a = match field_value {
        None | Some(Value::Null) => Some(0.0),
        Some(v) => coerce_f64(v),
    };
    let b = coerce_f64(expected);
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// How rules within an expression combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionOperator {
    And,
    Or,
}

impl Default for ExpressionOperator {
    fn default() -> Self {
        Self::And
    }
}

/// A policy expression: a list of rules joined by and/or.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyExpression {
    pub rules: Vec<PolicyRule>,
    #[serde(default)]
    pub operator: ExpressionOperator,
}

impl PolicyExpression {
    pub fn all(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
            operator: ExpressionOperator::And,
        }
    }

    pub fn any(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
            operator: ExpressionOperator::Or,
        }
    }

    /// An empty expression evaluates to true.
    pub fn evaluate(&self, context: &Value) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        match self.operator {
            ExpressionOperator::And => self.rules.iter().all(|rule| rule.evaluate(context)),
            ExpressionOperator::Or => self.rules.iter().any(|rule| rule.evaluate(context)),
        }
    }

    /// Rules that evaluated true, serialized for violation details.
    pub fn failed_rules(&self, context: &Value) -> Vec<Value> {
        self.rules
            .iter()
            .filter(|rule| rule.evaluate(context))
            .filter_map(|rule| serde_json::to_value(rule).ok())
            .collect()
    }
}

/// A complete governance policy.
///
/// Exactly one of `budget` or `expression` is typically set; `budget` wins
/// when both are present. An expression describes the *forbidden* condition:
/// the policy fails when the expression evaluates TRUE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<PolicyExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub on_violation: PolicyViolationAction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Outcome of evaluating one policy against one context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub policy_id: String,
    pub policy_name: String,
    pub status: PolicyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_details: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Pass,
    Fail,
}

impl Policy {
    pub fn budget(id: impl Into<String>, name: impl Into<String>, budget: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            expression: None,
            budget: Some(budget),
            on_violation: PolicyViolationAction::Advisory,
            enabled: true,
        }
    }

    /// Evaluate this policy against a context tree.
    pub fn evaluate(&self, context: &Value) -> PolicyOutcome {
        let mut outcome = PolicyOutcome {
            policy_id: self.id.clone(),
            policy_name: self.name.clone(),
            status: PolicyStatus::Pass,
            reason: None,
            violation_details: None,
        };

        if !self.enabled {
            outcome.reason = Some("Policy is disabled".to_string());
            return outcome;
        }

        if let Some(budget) = self.budget {
            let monthly_cost = context
                .get("estimated_monthly_cost")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if monthly_cost > budget {
                outcome.status = PolicyStatus::Fail;
                outcome.reason = Some(format!(
                    "Monthly cost ${:.2} exceeds budget ${:.2}",
                    monthly_cost, budget
                ));
                outcome.violation_details = Some(serde_json::json!({
                    "actual_cost": monthly_cost,
                    "budget_limit": budget,
                    "overage": monthly_cost - budget,
                }));
            } else {
                outcome.reason = Some(format!(
                    "Monthly cost ${:.2} within budget ${:.2}",
                    monthly_cost, budget
                ));
            }
        } else if let Some(expression) = &self.expression {
            if expression.evaluate(context) {
                outcome.status = PolicyStatus::Fail;
                outcome.reason = Some(format!("Policy '{}' rule violation", self.name));
                outcome.violation_details = Some(serde_json::json!({
                    "failed_rules": expression.failed_rules(context),
                }));
            } else {
                outcome.reason = Some(format!("Policy '{}' rules satisfied", self.name));
            }
        }

        outcome
    }

    /// A policy is resource-scoped when any rule references `resource.*`.
    pub fn is_resource_scoped(&self) -> bool {
        self.expression
            .as_ref()
            .map(|expr| expr.rules.iter().any(|rule| rule.field.starts_with("resource.")))
            .unwrap_or(false)
    }
}

/// One recorded violation, routed by severity into the evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub policy_id: String,
    pub policy_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// Aggregate result of evaluating every applicable policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub overall_status: OverallStatus,
    pub blocking_violations: Vec<PolicyViolation>,
    pub advisory_violations: Vec<PolicyViolation>,
    pub passed_policies: Vec<String>,
    pub evaluation_context: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Advisory,
    Block,
}
