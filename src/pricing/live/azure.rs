//! Azure Retail Prices API adapter.

use serde_json::Value;
use tracing::warn;

use crate::domain::{PriceQuote, PricingConfidence, Result};

const RETAIL_PRICES_ENDPOINT: &str = "https://prices.azure.com/api/retail/prices";

/// Live VM and SQL pricing via the Azure Retail Prices API.
pub struct AzureLivePricingAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl AzureLivePricingAdapter {
    pub fn new() -> Self {
        Self {
            client: super::http_client(),
            endpoint: RETAIL_PRICES_ENDPOINT.to_string(),
        }
    }

    /// Point the adapter at a different endpoint, for tests.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn get_vm_pricing(&self, vm_size: &str, region: &str) -> Result<Option<PriceQuote>> {
        let filter = format!(
            "serviceName eq 'Virtual Machines' and armSkuName eq '{vm_size}' \
             and armRegionName eq '{region}' and priceType eq 'Consumption'"
        );
        self.query(&filter).await
    }

    pub async fn get_sql_pricing(&self, sku: &str, region: &str) -> Result<Option<PriceQuote>> {
        let filter = format!(
            "serviceName eq 'SQL Database' and skuName eq '{sku}' \
             and armRegionName eq '{region}' and priceType eq 'Consumption'"
        );
        self.query(&filter).await
    }

    async fn query(&self, filter: &str) -> Result<Option<PriceQuote>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("$filter", filter), ("currencyCode", "USD")])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Azure Retail Prices API returned non-success");
            return Ok(None);
        }

        let body: Value = response.json().await?;
        let Some(items) = body.get("Items").and_then(Value::as_array) else {
            return Ok(None);
        };
        let Some(item) = items.first() else {
            return Ok(None);
        };

        let hourly = item
            .get("retailPrice")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Ok(Some(PriceQuote::hourly(hourly, PricingConfidence::High)))
    }
}

impl Default for AzureLivePricingAdapter {
    fn default() -> Self {
        Self::new()
    }
}
