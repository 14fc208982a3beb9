//! Static AWS pricing tables.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::{PriceCatalogItem, PriceQuote, PriceUnit, PricingConfidence};

/// On-demand EC2 hourly prices, keyed `{region}:{instance_type}`.
static ON_DEMAND_HOURLY_USD: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("us-east-1:t3.micro", 0.0104),
        ("us-east-1:t3.medium", 0.0416),
        ("us-east-1:m5.large", 0.096),
        ("us-east-1:c7g.large", 0.072),
    ])
});

/// Inherently-monthly flat rates.
pub const MONTHLY_FLAT_LB_APPLICATION: f64 = 18.0;
pub const MONTHLY_FLAT_EKS_CONTROL_PLANE: f64 = 73.0;

/// DynamoDB provisioned capacity, per unit-hour.
pub const DYNAMODB_READ_CAPACITY_HOUR: f64 = 0.00013;
pub const DYNAMODB_WRITE_CAPACITY_HOUR: f64 = 0.00065;

/// Hourly prices for managed services, keyed `{region}:{sku}`, with a
/// per-service default for unknown keys.
struct ServiceTable {
    prices: HashMap<&'static str, f64>,
    default_hourly: f64,
}

static RDS: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([
        ("us-east-1:db.t3.micro", 0.017),
        ("us-east-1:db.t3.small", 0.034),
    ]),
    default_hourly: 0.05,
});

static REDSHIFT: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([("us-east-1:dc2.large", 0.25)]),
    default_hourly: 0.25,
});

static OPENSEARCH: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([("us-east-1:t3.small.search", 0.036)]),
    default_hourly: 0.04,
});

static ELASTICACHE: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([("us-east-1:cache.t3.micro", 0.017)]),
    default_hourly: 0.03,
});

static NEPTUNE: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([
        ("us-east-1:db.t3.medium", 0.093),
        ("us-east-1:db.r5.large", 0.348),
    ]),
    default_hourly: 0.09,
});

static DOCUMENTDB: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([
        ("us-east-1:db.t3.medium", 0.078),
        ("us-east-1:db.r5.large", 0.277),
    ]),
    default_hourly: 0.08,
});

static MSK: Lazy<ServiceTable> = Lazy::new(|| ServiceTable {
    prices: HashMap::from([
        ("us-east-1:kafka.t3.small", 0.0456),
        ("us-east-1:kafka.m5.large", 0.21),
    ]),
    default_hourly: 0.05,
});

/// AWS managed services with region-keyed static hourly tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsService {
    Rds,
    Redshift,
    Opensearch,
    Elasticache,
    Neptune,
    DocumentDb,
    Msk,
}

impl AwsService {
    fn table(&self) -> &'static ServiceTable {
        match self {
            Self::Rds => &RDS,
            Self::Redshift => &REDSHIFT,
            Self::Opensearch => &OPENSEARCH,
            Self::Elasticache => &ELASTICACHE,
            Self::Neptune => &NEPTUNE,
            Self::DocumentDb => &DOCUMENTDB,
            Self::Msk => &MSK,
        }
    }
}

/// EC2 on-demand price for a region/instance-type pair. Unknown keys fall
/// back to $0.10/hr at low confidence.
pub fn get_aws_ec2_ondemand_price(region: &str, instance_type: &str) -> PriceQuote {
    let key = format!("{region}:{instance_type}");
    match ON_DEMAND_HOURLY_USD.get(key.as_str()) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.10, PricingConfidence::Low),
    }
}

/// Hourly price for a managed service SKU. Exact keys are high confidence;
/// service defaults are medium.
pub fn get_aws_service_price(service: AwsService, region: &str, sku: &str) -> PriceQuote {
    let table = service.table();
    let key = format!("{region}:{sku}");
    match table.prices.get(key.as_str()) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(table.default_hourly, PricingConfidence::Medium),
    }
}

/// Application load balancer flat monthly price.
pub fn get_aws_load_balancer_price() -> PriceQuote {
    PriceQuote::monthly(MONTHLY_FLAT_LB_APPLICATION, PricingConfidence::High)
}

/// EKS control plane flat monthly price.
pub fn get_aws_eks_price() -> PriceQuote {
    PriceQuote::monthly(MONTHLY_FLAT_EKS_CONTROL_PLANE, PricingConfidence::High)
}

/// DynamoDB provisioned-capacity monthly price for the given capacities.
pub fn get_aws_dynamodb_provisioned_price(read_capacity: i64, write_capacity: i64) -> PriceQuote {
    let hourly = read_capacity as f64 * DYNAMODB_READ_CAPACITY_HOUR
        + write_capacity as f64 * DYNAMODB_WRITE_CAPACITY_HOUR;
    PriceQuote::hourly(hourly, PricingConfidence::High)
}

/// Enumerate the EC2 on-demand catalog, optionally filtered.
pub fn list_aws_ec2_ondemand(
    region: Option<&str>,
    instance_types: Option<&[String]>,
) -> Vec<PriceCatalogItem> {
    let mut items: Vec<PriceCatalogItem> = ON_DEMAND_HOURLY_USD
        .iter()
        .filter_map(|(key, &price)| {
            let (r, it) = key.split_once(':')?;
            if let Some(region) = region {
                if r != region {
                    return None;
                }
            }
            if let Some(types) = instance_types {
                if !types.iter().any(|t| t == it) {
                    return None;
                }
            }
            Some(PriceCatalogItem {
                sku: format!("aws_ec2_{it}_ondemand_{r}"),
                description: Some(format!("EC2 {it} on-demand in {r}")),
                region: r.to_string(),
                unit: PriceUnit::Hour,
                price,
                attributes: None,
            })
        })
        .collect();
    items.sort_by(|a, b| a.sku.cmp(&b.sku));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_instance_high_confidence() {
        let quote = get_aws_ec2_ondemand_price("us-east-1", "t3.medium");
        assert_eq!(quote.hourly_price, 0.0416);
        assert_eq!(quote.confidence, PricingConfidence::High);
        assert!((quote.monthly_price - 0.0416 * 730.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_instance_low_fallback() {
        let quote = get_aws_ec2_ondemand_price("us-east-1", "x99.mega");
        assert_eq!(quote.hourly_price, 0.10);
        assert_eq!(quote.confidence, PricingConfidence::Low);
    }

    #[test]
    fn test_unknown_region_low_fallback() {
        let quote = get_aws_ec2_ondemand_price("mars-east-1", "t3.medium");
        assert_eq!(quote.confidence, PricingConfidence::Low);
    }

    #[test]
    fn test_service_defaults() {
        let quote = get_aws_service_price(AwsService::Rds, "eu-west-1", "db.m5.large");
        assert_eq!(quote.hourly_price, 0.05);
        assert_eq!(quote.confidence, PricingConfidence::Medium);

        let quote = get_aws_service_price(AwsService::Rds, "us-east-1", "db.t3.micro");
        assert_eq!(quote.hourly_price, 0.017);
        assert_eq!(quote.confidence, PricingConfidence::High);
    }

    #[test]
    fn test_dynamodb_capacity_math() {
        let quote = get_aws_dynamodb_provisioned_price(10, 5);
        let expected_hourly = 10.0 * 0.00013 + 5.0 * 0.00065;
        assert!((quote.hourly_price - expected_hourly).abs() < 1e-12);
    }

    #[test]
    fn test_catalog_listing_filters() {
        let all = list_aws_ec2_ondemand(None, None);
        assert_eq!(all.len(), 4);

        let filtered = list_aws_ec2_ondemand(Some("us-east-1"), Some(&["t3.micro".to_string()]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sku, "aws_ec2_t3.micro_ondemand_us-east-1");
        assert_eq!(filtered[0].price, 0.0104);
    }

    #[test]
    fn test_flat_monthly_rates() {
        assert_eq!(get_aws_load_balancer_price().monthly_price, 18.0);
        assert_eq!(get_aws_eks_price().monthly_price, 73.0);
    }
}
