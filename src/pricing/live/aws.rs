//! AWS Pricing List API adapter.

use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{PriceQuote, PricingConfidence, Result};

const PRICING_API_ENDPOINT: &str = "https://pricing.us-east-1.amazonaws.com";

/// Live EC2/RDS pricing via the AWS Pricing List API (`GetProducts`).
pub struct AwsLivePricingAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl AwsLivePricingAdapter {
    pub fn new() -> Self {
        Self {
            client: super::http_client(),
            endpoint: PRICING_API_ENDPOINT.to_string(),
        }
    }

    /// Point the adapter at a different endpoint, for tests.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            endpoint: endpoint.into(),
        }
    }

    /// On-demand EC2 price for an instance type. The filter set
    /// (`tenancy=Shared`, `preInstalledSw=NA`, `capacitystatus=Used`)
    /// narrows to a single SKU for Linux; the first SKU returned wins.
    pub async fn get_ec2_pricing(
        &self,
        instance_type: &str,
        region: &str,
        operating_system: &str,
    ) -> Result<Option<PriceQuote>> {
        let filters = json!([
            {"Type": "TERM_MATCH", "Field": "instanceType", "Value": instance_type},
            {"Type": "TERM_MATCH", "Field": "location", "Value": region_name(region)},
            {"Type": "TERM_MATCH", "Field": "operatingSystem", "Value": operating_system},
            {"Type": "TERM_MATCH", "Field": "tenancy", "Value": "Shared"},
            {"Type": "TERM_MATCH", "Field": "preInstalledSw", "Value": "NA"},
            {"Type": "TERM_MATCH", "Field": "capacitystatus", "Value": "Used"},
        ]);
        self.get_products("AmazonEC2", filters).await
    }

    /// On-demand RDS price for an instance class and engine.
    pub async fn get_rds_pricing(
        &self,
        instance_class: &str,
        engine: &str,
        region: &str,
    ) -> Result<Option<PriceQuote>> {
        let mut engine_name = engine.to_string();
        if let Some(first) = engine_name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let filters = json!([
            {"Type": "TERM_MATCH", "Field": "instanceType", "Value": instance_class},
            {"Type": "TERM_MATCH", "Field": "location", "Value": region_name(region)},
            {"Type": "TERM_MATCH", "Field": "databaseEngine", "Value": engine_name},
            {"Type": "TERM_MATCH", "Field": "deploymentOption", "Value": "Single-AZ"},
        ]);
        self.get_products("AmazonRDS", filters).await
    }

    async fn get_products(&self, service_code: &str, filters: Value) -> Result<Option<PriceQuote>> {
        let payload = json!({
            "ServiceCode": service_code,
            "Filters": filters,
            "FormatVersion": "aws_v1",
            "MaxResults": 1,
        });

        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("Content-Type", "application/x-amz-json-1.1")
            .header("X-Amz-Target", "AWSPriceListService.GetProducts")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), service_code, "AWS Pricing API returned non-success");
            return Ok(None);
        }

        let body: Value = response.json().await?;
        let Some(price_list) = body.get("PriceList").and_then(Value::as_array) else {
            return Ok(None);
        };
        let Some(first) = price_list.first() else {
            return Ok(None);
        };

        // Entries arrive as JSON-encoded strings.
        let price_item: Value = match first {
            Value::String(encoded) => serde_json::from_str(encoded)?,
            other => other.clone(),
        };

        Ok(extract_on_demand_hourly(&price_item).map(|hourly| {
            PriceQuote::hourly(hourly, PricingConfidence::High)
        }))
    }
}

impl Default for AwsLivePricingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk terms.OnDemand.*.priceDimensions.*.pricePerUnit.USD.
fn extract_on_demand_hourly(price_item: &Value) -> Option<f64> {
    let on_demand = price_item.get("terms")?.get("OnDemand")?.as_object()?;
    for term in on_demand.values() {
        let Some(dimensions) = term.get("priceDimensions").and_then(Value::as_object) else {
            continue;
        };
        for dimension in dimensions.values() {
            if let Some(usd) = dimension
                .get("pricePerUnit")
                .and_then(|p| p.get("USD"))
                .and_then(Value::as_str)
            {
                if let Ok(hourly) = usd.parse::<f64>() {
                    return Some(hourly);
                }
            }
        }
    }
    None
}

/// Region code to Pricing API location name.
fn region_name(region_code: &str) -> &'static str {
    match region_code {
        "us-east-1" => "US East (N. Virginia)",
        "us-east-2" => "US East (Ohio)",
        "us-west-1" => "US West (N. California)",
        "us-west-2" => "US West (Oregon)",
        "eu-west-1" => "EU (Ireland)",
        "eu-west-2" => "EU (London)",
        "eu-west-3" => "EU (Paris)",
        "eu-central-1" => "EU (Frankfurt)",
        "ap-southeast-1" => "Asia Pacific (Singapore)",
        "ap-southeast-2" => "Asia Pacific (Sydney)",
        "ap-northeast-1" => "Asia Pacific (Tokyo)",
        "ap-south-1" => "Asia Pacific (Mumbai)",
        _ => "US East (N. Virginia)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_name_mapping() {
        assert_eq!(region_name("us-east-1"), "US East (N. Virginia)");
        assert_eq!(region_name("eu-central-1"), "EU (Frankfurt)");
        assert_eq!(region_name("unknown-region"), "US East (N. Virginia)");
    }

    #[test]
    fn test_extract_on_demand_hourly() {
        let price_item = json!({
            "terms": {
                "OnDemand": {
                    "ABC.XYZ": {
                        "priceDimensions": {
                            "ABC.XYZ.6YS6EN2CT7": {
                                "pricePerUnit": {"USD": "0.0416000000"}
                            }
                        }
                    }
                }
            }
        });
        assert_eq!(extract_on_demand_hourly(&price_item), Some(0.0416));
    }

    #[test]
    fn test_extract_missing_terms() {
        assert_eq!(extract_on_demand_hourly(&json!({"product": {}})), None);
    }
}
