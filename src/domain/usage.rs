use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::api::CloudProvider;
use super::resource::PricingConfidence;

/// Single usage metric datapoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetric {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    pub metric_name: String,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
}

/// Usage data for a specific resource over a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource_id: String,
    pub resource_type: String,
    pub region: String,
    pub cloud_provider: CloudProvider,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub metrics: Vec<UsageMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_cpu_utilization: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_memory_utilization: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_network_in_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_network_out_gb: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Historical cost/usage record from a billing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostUsageRecord {
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cost: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub usage_amount: f64,
    pub usage_unit: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Summary of usage data over a time period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub cloud_provider: CloudProvider,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub total_resources: usize,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub average_cost_per_resource: f64,
    #[serde(default)]
    pub total_usage: f64,
    #[serde(default)]
    pub average_usage: f64,
    #[serde(default = "default_usage_unit")]
    pub usage_unit: String,
    #[serde(default)]
    pub records: Vec<CostUsageRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceUsage>,
    pub confidence: PricingConfidence,
    #[serde(default = "default_completeness")]
    pub data_completeness: f64,
}

fn default_usage_unit() -> String {
    "hours".to_string()
}

fn default_completeness() -> f64 {
    1.0
}

/// Query parameters for fetching usage data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageQuery {
    pub cloud_provider: CloudProvider,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

fn default_granularity() -> Granularity {
    Granularity::Daily
}

fn default_max_results() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_query_defaults() {
        let query: UsageQuery = serde_json::from_value(serde_json::json!({
            "cloud_provider": "aws",
            "start_time": "2026-07-01T00:00:00Z",
            "end_time": "2026-07-31T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(query.granularity, Granularity::Daily);
        assert_eq!(query.max_results, 1000);
    }

    #[test]
    fn test_granularity_wire_names() {
        assert_eq!(serde_json::to_string(&Granularity::Hourly).unwrap(), "\"HOURLY\"");
    }
}
