use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::resource::PricingConfidence;

/// IaC document formats accepted by the analysis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacType {
    Terraform,
    Ansible,
    Helm,
    K8s,
    Pulumi,
}

impl IacType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::Ansible => "ansible",
            Self::Helm => "helm",
            Self::K8s => "k8s",
            Self::Pulumi => "pulumi",
        }
    }
}

/// Deployment environment an analysis is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request for a cost impact check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub iac_type: IacType,
    /// base64(utf8(source file contents))
    pub iac_payload: String,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_rules: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, serde_json::Value>>,
}

/// Cost breakdown for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBreakdownItem {
    pub resource_id: String,
    pub monthly_cost: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ResourceBreakdownItem {
    pub fn new(resource_id: impl Into<String>, monthly_cost: f64) -> Self {
        Self {
            resource_id: resource_id.into(),
            monthly_cost,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Cost optimization recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_monthly: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    RightSize,
    Spot,
    Reserved,
    Autoscale,
    Other,
}

/// Compact policy verdict attached to a check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub status: PolicyEvalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEvalStatus {
    Pass,
    Fail,
}

/// Response from a cost impact check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub estimated_monthly_cost: f64,
    pub estimated_first_week_cost: f64,
    pub breakdown_by_resource: Vec<ResourceBreakdownItem>,
    pub risk_flags: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_eval: Option<PolicyEvaluation>,
    pub pricing_confidence: PricingConfidence,
    pub duration_ms: i64,
}

/// Request for optimization suggestions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iac_type: Option<IacType>,
}

/// Response with optimization suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Recommendation>,
}

/// Request to evaluate a single stored policy against an IaC payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub iac_type: IacType,
    pub iac_payload: String,
    pub policy_id: String,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PolicyRequestMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyRequestMode {
    Advisory,
    Blocking,
}

/// Query for the price catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuery {
    pub cloud: CloudProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCatalogItem {
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub region: String,
    pub unit: PriceUnit,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceUnit {
    Hour,
    Month,
    GbMonth,
    Requests,
}

/// Response with a price catalog slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCatalogResponse {
    pub updated_at: String,
    pub pricing_confidence: PricingConfidence,
    pub items: Vec<PriceCatalogItem>,
}

/// Query for listing recent analyses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// One recorded analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub request_id: String,
    pub started_at: String,
    pub duration_ms: i64,
    pub summary: String,
}

/// Paginated list of analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<AnalysisItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_request_deserializes_wire_shape() {
        let body = serde_json::json!({
            "iac_type": "terraform",
            "iac_payload": "cmVzb3VyY2U=",
            "environment": "dev",
            "budget_rules": {"monthly_budget": 100.0}
        });
        let req: CheckRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.iac_type, IacType::Terraform);
        assert_eq!(req.environment, Environment::Dev);
        assert_eq!(req.budget_rules.unwrap()["monthly_budget"], 100.0);
    }

    #[test]
    fn test_breakdown_item_notes_default_empty() {
        let body = serde_json::json!({"resource_id": "x-lb-us-east-1", "monthly_cost": 18.0});
        let item: ResourceBreakdownItem = serde_json::from_value(body).unwrap();
        assert!(item.notes.is_empty());
    }

    #[test]
    fn test_price_unit_serialization() {
        assert_eq!(serde_json::to_string(&PriceUnit::GbMonth).unwrap(), "\"gb-month\"");
        assert_eq!(serde_json::to_string(&PriceUnit::Hour).unwrap(), "\"hour\"");
    }
}
