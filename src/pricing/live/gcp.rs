//! GCP Cloud Billing SKUs adapter.

use serde_json::Value;
use tracing::warn;

use crate::domain::{PriceQuote, PricingConfidence, Result};

const BILLING_API_ENDPOINT: &str = "https://cloudbilling.googleapis.com/v1";

/// Compute Engine service ID in the Cloud Billing catalog.
const COMPUTE_ENGINE_SERVICE: &str = "6F81-5844-456A";

/// Live Compute Engine pricing via the Cloud Billing SKU catalog.
///
/// SKUs are matched by description substring on machine type and region;
/// the first match wins, as some regions can double-match.
pub struct GcpLivePricingAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GcpLivePricingAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            endpoint: BILLING_API_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the adapter at a different endpoint, for tests.
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn get_compute_pricing(
        &self,
        machine_type: &str,
        region: &str,
    ) -> Result<Option<PriceQuote>> {
        let url = format!("{}/services/{}/skus", self.endpoint, COMPUTE_ENGINE_SERVICE);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("currencyCode", "USD")])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "GCP Billing API returned non-success");
            return Ok(None);
        }

        let body: Value = response.json().await?;
        let Some(skus) = body.get("skus").and_then(Value::as_array) else {
            return Ok(None);
        };

        for sku in skus {
            let description = sku.get("description").and_then(Value::as_str).unwrap_or("");
            if description.contains(machine_type) && description.to_lowercase().contains(region) {
                if let Some(hourly) = extract_unit_price(sku) {
                    return Ok(Some(PriceQuote::hourly(hourly, PricingConfidence::High)));
                }
            }
        }

        Ok(None)
    }
}

/// pricingInfo[0].pricingExpression.tieredRates[0].unitPrice -> units + nanos.
fn extract_unit_price(sku: &Value) -> Option<f64> {
    let unit_price = sku
        .get("pricingInfo")?
        .as_array()?
        .first()?
        .get("pricingExpression")?
        .get("tieredRates")?
        .as_array()?
        .first()?
        .get("unitPrice")?;

    let units: f64 = match unit_price.get("units") {
        Some(Value::String(s)) => s.parse().ok()?,
        Some(Value::Number(n)) => n.as_f64()?,
        _ => 0.0,
    };
    let nanos = unit_price.get("nanos").and_then(Value::as_f64).unwrap_or(0.0);
    Some(units + nanos / 1_000_000_000.0)
}
