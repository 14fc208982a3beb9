//! Unified pricing factory: live first, static fallback, generic last.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::pricing::{PricingCache, QuoteKind};
use crate::config::PricingConfig;
use crate::domain::{CloudProvider, PriceQuote, PricingConfidence};

use super::live::{AwsLivePricingAdapter, AzureLivePricingAdapter, GcpLivePricingAdapter};
use super::{aws, azure, gcp};

/// Resolves price quotes with the live → static → generic fallback chain.
/// Lookups never fail; the weakest result is a low-confidence generic quote.
#[derive(Clone)]
pub struct PricingFactory {
    live_enabled: bool,
    fallback_to_static: bool,
    aws_live: Option<Arc<AwsLivePricingAdapter>>,
    gcp_live: Option<Arc<GcpLivePricingAdapter>>,
    azure_live: Option<Arc<AzureLivePricingAdapter>>,
    cache: PricingCache,
}

impl PricingFactory {
    pub fn new(config: &PricingConfig, cache: PricingCache) -> Self {
        let aws_live = (config.live_enabled && config.aws_enabled)
            .then(|| Arc::new(AwsLivePricingAdapter::new()));
        let gcp_live = match (&config.gcp_api_key, config.live_enabled && config.gcp_enabled) {
            (Some(key), true) => Some(Arc::new(GcpLivePricingAdapter::new(key.clone()))),
            (None, true) => {
                warn!("GCP live pricing enabled but API key not provided");
                None
            }
            _ => None,
        };
        let azure_live = (config.live_enabled && config.azure_enabled)
            .then(|| Arc::new(AzureLivePricingAdapter::new()));

        Self {
            live_enabled: config.live_enabled,
            fallback_to_static: config.fallback_to_static,
            aws_live,
            gcp_live,
            azure_live,
            cache,
        }
    }

    /// A factory that only ever consults static tables.
    pub fn static_only(cache: PricingCache) -> Self {
        Self {
            live_enabled: false,
            fallback_to_static: true,
            aws_live: None,
            gcp_live: None,
            azure_live: None,
            cache,
        }
    }

    /// Instance/VM price for any cloud.
    pub async fn instance_price(&self, cloud: CloudProvider, sku: &str, region: &str) -> PriceQuote {
        if let Some(quote) = self
            .cache
            .get(QuoteKind::Instance, cloud, sku, Some(region))
            .await
        {
            debug!(%cloud, sku, "instance quote served from cache");
            return quote;
        }

        let quote = self.resolve_instance(cloud, sku, region).await;
        self.cache
            .put(QuoteKind::Instance, cloud, sku, Some(region), &quote)
            .await;
        quote
    }

    async fn resolve_instance(&self, cloud: CloudProvider, sku: &str, region: &str) -> PriceQuote {
        if self.live_enabled {
            match self.live_instance(cloud, sku, region).await {
                Some(quote) => {
                    info!(%cloud, sku, region, "using live pricing");
                    return quote;
                }
                None if !self.fallback_to_static => return generic_fallback(),
                None => {}
            }
        }
        match cloud {
            CloudProvider::Aws => aws::get_aws_ec2_ondemand_price(region, sku),
            CloudProvider::Gcp => gcp::get_gcp_instance_price(sku, region),
            CloudProvider::Azure => azure::get_azure_vm_price(sku, region),
        }
    }

    async fn live_instance(&self, cloud: CloudProvider, sku: &str, region: &str) -> Option<PriceQuote> {
        let result = match cloud {
            CloudProvider::Aws => {
                self.aws_live
                    .as_ref()?
                    .get_ec2_pricing(sku, region, "Linux")
                    .await
            }
            CloudProvider::Gcp => self.gcp_live.as_ref()?.get_compute_pricing(sku, region).await,
            CloudProvider::Azure => self.azure_live.as_ref()?.get_vm_pricing(sku, region).await,
        };
        match result {
            Ok(quote) => quote,
            Err(err) => {
                warn!(%cloud, sku, error = %err, "live pricing failed");
                None
            }
        }
    }

    /// Managed database price for any cloud.
    pub async fn database_price(&self, cloud: CloudProvider, sku: &str, region: &str) -> PriceQuote {
        if let Some(quote) = self
            .cache
            .get(QuoteKind::Database, cloud, sku, Some(region))
            .await
        {
            return quote;
        }

        let quote = self.resolve_database(cloud, sku, region).await;
        self.cache
            .put(QuoteKind::Database, cloud, sku, Some(region), &quote)
            .await;
        quote
    }

    async fn resolve_database(&self, cloud: CloudProvider, sku: &str, region: &str) -> PriceQuote {
        if self.live_enabled {
            let live = match cloud {
                CloudProvider::Aws => match &self.aws_live {
                    Some(adapter) => adapter
                        .get_rds_pricing(sku, "postgres", region)
                        .await
                        .unwrap_or_else(|err| {
                            warn!(error = %err, "live RDS pricing failed");
                            None
                        }),
                    None => None,
                },
                // Cloud SQL has no SKU-addressable live endpoint wired.
                CloudProvider::Gcp => None,
                CloudProvider::Azure => match &self.azure_live {
                    Some(adapter) => adapter.get_sql_pricing(sku, region).await.unwrap_or_else(|err| {
                        warn!(error = %err, "live SQL pricing failed");
                        None
                    }),
                    None => None,
                },
            };
            if let Some(quote) = live {
                return quote;
            }
            if !self.fallback_to_static {
                return generic_fallback();
            }
        }
        match cloud {
            CloudProvider::Aws => aws::get_aws_service_price(aws::AwsService::Rds, region, sku),
            CloudProvider::Gcp => gcp::get_gcp_database_price(sku, region),
            CloudProvider::Azure => azure::get_azure_sql_price(sku, region),
        }
    }
}

/// The quote of last resort.
fn generic_fallback() -> PriceQuote {
    PriceQuote {
        hourly_price: 0.10,
        monthly_price: 73.0,
        confidence: PricingConfidence::Low,
        attributes: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheClient;

    fn factory() -> PricingFactory {
        PricingFactory::static_only(PricingCache::new(CacheClient::disabled()))
    }

    #[tokio::test]
    async fn test_static_instance_prices() {
        let factory = factory();
        let quote = factory
            .instance_price(CloudProvider::Aws, "t3.medium", "us-east-1")
            .await;
        assert_eq!(quote.hourly_price, 0.0416);
        assert_eq!(quote.confidence, PricingConfidence::High);

        let quote = factory
            .instance_price(CloudProvider::Gcp, "e2-standard-4", "us-central1")
            .await;
        assert_eq!(quote.hourly_price, 0.134);

        let quote = factory
            .instance_price(CloudProvider::Azure, "Standard_D2s_v3", "eastus")
            .await;
        assert_eq!(quote.hourly_price, 0.096);
    }

    #[tokio::test]
    async fn test_unknown_sku_low_confidence() {
        let factory = factory();
        let quote = factory
            .instance_price(CloudProvider::Aws, "no-such-type", "us-east-1")
            .await;
        assert_eq!(quote.confidence, PricingConfidence::Low);
        assert_eq!(quote.hourly_price, 0.10);
    }

    #[tokio::test]
    async fn test_database_static_paths() {
        let factory = factory();
        let quote = factory
            .database_price(CloudProvider::Gcp, "db-n1-standard-2", "us-central1")
            .await;
        assert_eq!(quote.hourly_price, 0.082);

        let quote = factory
            .database_price(CloudProvider::Azure, "S0", "eastus")
            .await;
        assert_eq!(quote.hourly_price, 0.0203);
    }

    #[test]
    fn test_generic_fallback_shape() {
        let quote = generic_fallback();
        assert_eq!(quote.hourly_price, 0.10);
        assert_eq!(quote.monthly_price, 73.0);
        assert_eq!(quote.confidence, PricingConfidence::Low);
    }
}
