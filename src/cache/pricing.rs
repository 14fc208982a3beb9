//! Cache layer for price quotes.

use std::time::Duration;

use crate::domain::{CloudProvider, PriceQuote};

use super::CacheClient;

/// Price quotes change infrequently; cached for 24 hours.
const QUOTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Quote kinds, part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Instance,
    Database,
    Storage,
    LoadBalancer,
    Kubernetes,
    Functions,
    Redis,
    Cosmos,
}

impl QuoteKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Database => "database",
            Self::Storage => "storage",
            Self::LoadBalancer => "load_balancer",
            Self::Kubernetes => "kubernetes",
            Self::Functions => "functions",
            Self::Redis => "redis",
            Self::Cosmos => "cosmos",
        }
    }
}

/// Quote cache keyed by `(kind, cloud, sku, region)`.
#[derive(Clone)]
pub struct PricingCache {
    cache: CacheClient,
}

impl PricingCache {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    fn key(kind: QuoteKind, cloud: CloudProvider, sku: &str, region: Option<&str>) -> String {
        format!(
            "pricing:{}:{}:{}:{}",
            kind.as_str(),
            cloud,
            sku,
            region.unwrap_or("default")
        )
    }

    pub async fn get(
        &self,
        kind: QuoteKind,
        cloud: CloudProvider,
        sku: &str,
        region: Option<&str>,
    ) -> Option<PriceQuote> {
        self.cache.get_json(&Self::key(kind, cloud, sku, region)).await
    }

    /// Best-effort write.
    pub async fn put(
        &self,
        kind: QuoteKind,
        cloud: CloudProvider,
        sku: &str,
        region: Option<&str>,
        quote: &PriceQuote,
    ) {
        self.cache
            .set_json(&Self::key(kind, cloud, sku, region), quote, QUOTE_TTL)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        let key = PricingCache::key(QuoteKind::Instance, CloudProvider::Aws, "t3.medium", Some("us-east-1"));
        assert_eq!(key, "pricing:instance:aws:t3.medium:us-east-1");
        let key = PricingCache::key(QuoteKind::Storage, CloudProvider::Gcp, "standard", None);
        assert_eq!(key, "pricing:storage:gcp:standard:default");
    }

    #[tokio::test]
    async fn test_disabled_cache_round_trip() {
        let cache = PricingCache::new(CacheClient::disabled());
        assert!(cache
            .get(QuoteKind::Instance, CloudProvider::Aws, "t3.medium", None)
            .await
            .is_none());
    }
}
