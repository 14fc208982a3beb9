//! Per-cloud usage adapter implementations.
//!
//! These are deliberately thin: each probes for credentials in the
//! environment and reports unavailable without them, so a deployment with
//! no cloud access still boots cleanly.

use async_trait::async_trait;

use crate::domain::{
    CloudProvider, CostUsageRecord, FinOpsError, ResourceUsage, Result, UsageQuery, UsageSummary,
};

use super::UsageAdapter;

fn env_present(names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false))
}

fn unavailable(cloud: CloudProvider) -> FinOpsError {
    FinOpsError::Http(format!("{cloud} usage APIs unavailable: missing credentials"))
}

macro_rules! usage_adapter {
    ($name:ident, $cloud:expr, $creds:expr) => {
        /// Usage adapter; available only when the provider credentials are
        /// present in the environment.
        pub struct $name {
            available: bool,
        }

        impl $name {
            pub fn from_env() -> Self {
                Self {
                    available: env_present($creds),
                }
            }
        }

        #[async_trait]
        impl UsageAdapter for $name {
            fn cloud(&self) -> CloudProvider {
                $cloud
            }

            async fn is_available(&self) -> bool {
                self.available
            }

            async fn resource_usage(&self, _query: &UsageQuery) -> Result<Vec<ResourceUsage>> {
                if !self.available {
                    return Err(unavailable($cloud));
                }
                // Credentialed metric collection is wired per deployment;
                // with no collector configured the result set is empty.
                Ok(Vec::new())
            }

            async fn cost_usage(&self, _query: &UsageQuery) -> Result<Vec<CostUsageRecord>> {
                if !self.available {
                    return Err(unavailable($cloud));
                }
                Ok(Vec::new())
            }

            async fn usage_summary(&self, query: &UsageQuery) -> Result<UsageSummary> {
                if !self.available {
                    return Err(unavailable($cloud));
                }
                let records = self.cost_usage(query).await?;
                let resources = self.resource_usage(query).await?;
                let total_cost: f64 = records.iter().map(|record| record.cost).sum();
                let total_usage: f64 = records.iter().map(|record| record.usage_amount).sum();
                let count = records.len().max(1) as f64;
                Ok(UsageSummary {
                    cloud_provider: $cloud,
                    resource_type: query
                        .resource_types
                        .as_ref()
                        .and_then(|types| types.first().cloned())
                        .unwrap_or_else(|| "all".to_string()),
                    region: query
                        .regions
                        .as_ref()
                        .and_then(|regions| regions.first().cloned()),
                    start_time: query.start_time,
                    end_time: query.end_time,
                    total_resources: resources.len(),
                    total_cost,
                    average_cost_per_resource: total_cost / count,
                    total_usage,
                    average_usage: total_usage / count,
                    usage_unit: "hours".to_string(),
                    records,
                    resources,
                    confidence: crate::domain::PricingConfidence::Medium,
                    data_completeness: 1.0,
                })
            }
        }
    };
}

usage_adapter!(
    AwsUsageAdapter,
    CloudProvider::Aws,
    &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"]
);
usage_adapter!(
    GcpUsageAdapter,
    CloudProvider::Gcp,
    &["GOOGLE_APPLICATION_CREDENTIALS"]
);
usage_adapter!(
    AzureUsageAdapter,
    CloudProvider::Azure,
    &["AZURE_SUBSCRIPTION_ID", "AZURE_TENANT_ID"]
);
