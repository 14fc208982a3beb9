//! Advisory usage adapters: historical metric and cost lookups from cloud
//! monitoring/billing APIs. Never consulted by the cost simulator.

mod adapters;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::UsageConfig;
use crate::domain::{CloudProvider, CostUsageRecord, ResourceUsage, Result, UsageQuery, UsageSummary};

pub use adapters::{AwsUsageAdapter, AzureUsageAdapter, GcpUsageAdapter};

/// Read-only interface over a cloud's monitoring and billing APIs.
///
/// Implementations degrade to unavailable when credentials or SDK access
/// are missing; callers must check `is_available` before querying.
#[async_trait]
pub trait UsageAdapter: Send + Sync {
    fn cloud(&self) -> CloudProvider;

    /// Whether the adapter can reach its backing APIs.
    async fn is_available(&self) -> bool;

    /// Per-resource utilization metrics.
    async fn resource_usage(&self, query: &UsageQuery) -> Result<Vec<ResourceUsage>>;

    /// Historical billing records.
    async fn cost_usage(&self, query: &UsageQuery) -> Result<Vec<CostUsageRecord>>;

    /// Aggregate summary over the query window.
    async fn usage_summary(&self, query: &UsageQuery) -> Result<UsageSummary>;
}

struct CachedSummary {
    summary: UsageSummary,
    stored_at: Instant,
}

/// Lazily constructs per-cloud adapters and caches summaries with a TTL.
pub struct UsageFactory {
    enabled: bool,
    cache_ttl: Duration,
    adapters: RwLock<HashMap<CloudProvider, Arc<dyn UsageAdapter>>>,
    summaries: RwLock<HashMap<String, CachedSummary>>,
}

impl UsageFactory {
    pub fn new(config: &UsageConfig) -> Self {
        Self {
            enabled: config.enabled,
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            adapters: RwLock::new(HashMap::new()),
            summaries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get or construct the adapter for a cloud.
    pub async fn adapter(&self, cloud: CloudProvider) -> Arc<dyn UsageAdapter> {
        if let Some(adapter) = self.adapters.read().await.get(&cloud) {
            return adapter.clone();
        }

        let adapter: Arc<dyn UsageAdapter> = match cloud {
            CloudProvider::Aws => Arc::new(AwsUsageAdapter::from_env()),
            CloudProvider::Gcp => Arc::new(GcpUsageAdapter::from_env()),
            CloudProvider::Azure => Arc::new(AzureUsageAdapter::from_env()),
        };
        self.adapters.write().await.insert(cloud, adapter.clone());
        adapter
    }

    /// Summary lookup with TTL caching.
    pub async fn usage_summary(&self, query: &UsageQuery) -> Result<Option<UsageSummary>> {
        if !self.enabled {
            return Ok(None);
        }

        let key = format!(
            "{}:{}:{}:{:?}",
            query.cloud_provider, query.start_time, query.end_time, query.resource_types
        );

        if let Some(cached) = self.summaries.read().await.get(&key) {
            if cached.stored_at.elapsed() < self.cache_ttl {
                debug!(key, "usage summary served from cache");
                return Ok(Some(cached.summary.clone()));
            }
        }

        let adapter = self.adapter(query.cloud_provider).await;
        if !adapter.is_available().await {
            return Ok(None);
        }

        let summary = adapter.usage_summary(query).await?;
        self.summaries.write().await.insert(
            key,
            CachedSummary {
                summary: summary.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(Some(summary))
    }

    /// Availability map across all clouds.
    pub async fn availability(&self) -> HashMap<CloudProvider, bool> {
        let mut availability = HashMap::new();
        for cloud in [CloudProvider::Aws, CloudProvider::Gcp, CloudProvider::Azure] {
            let adapter = self.adapter(cloud).await;
            availability.insert(cloud, adapter.is_available().await);
        }
        availability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn query() -> UsageQuery {
        UsageQuery {
            cloud_provider: CloudProvider::Aws,
            start_time: Utc::now() - chrono::Duration::days(7),
            end_time: Utc::now(),
            resource_ids: None,
            resource_types: None,
            regions: None,
            granularity: crate::domain::Granularity::Daily,
            max_results: 100,
        }
    }

    #[tokio::test]
    async fn test_disabled_factory_returns_none() {
        let factory = UsageFactory::new(&UsageConfig {
            enabled: false,
            cache_ttl_seconds: 10,
        });
        assert!(factory.usage_summary(&query()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_adapters_without_credentials_unavailable() {
        let factory = UsageFactory::new(&UsageConfig {
            enabled: true,
            cache_ttl_seconds: 10,
        });
        // Without credentials every adapter degrades to unavailable and
        // the factory yields no summary rather than erroring.
        let availability = factory.availability().await;
        for (_, available) in availability {
            assert!(!available);
        }
        assert!(factory.usage_summary(&query()).await.unwrap().is_none());
    }
}
