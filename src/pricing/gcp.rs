//! Static GCP pricing tables (us-central1 on-demand reference prices).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::{PriceQuote, PricingConfidence};

/// Compute Engine hourly prices by machine type.
static COMPUTE_ENGINE_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // General purpose
        ("e2-micro", 0.006),
        ("e2-small", 0.012),
        ("e2-medium", 0.024),
        ("e2-standard-2", 0.067),
        ("e2-standard-4", 0.134),
        ("e2-standard-8", 0.268),
        ("e2-standard-16", 0.536),
        // Compute optimized
        ("c2-standard-4", 0.208),
        ("c2-standard-8", 0.416),
        ("c2-standard-16", 0.832),
        ("c2-standard-30", 1.560),
        // Memory optimized
        ("m1-megamem-96", 6.303),
        ("m1-ultramem-40", 3.888),
        ("m1-ultramem-80", 7.776),
        // GPU
        ("n1-standard-4-gpu", 1.18),
        ("n1-standard-8-gpu", 2.36),
    ])
});

/// Cloud SQL hourly prices by tier.
static CLOUD_SQL_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("db-f1-micro", 0.017),
        ("db-g1-small", 0.025),
        ("db-n1-standard-1", 0.041),
        ("db-n1-standard-2", 0.082),
        ("db-n1-standard-4", 0.164),
        ("db-n1-standard-8", 0.328),
        ("db-n1-standard-16", 0.656),
        ("db-n1-standard-32", 1.312),
    ])
});

/// Cloud Storage prices per GB-month by storage class.
static CLOUD_STORAGE_GB_MONTH: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("standard", 0.020),
        ("nearline", 0.010),
        ("coldline", 0.004),
        ("archive", 0.0012),
    ])
});

/// Cloud Run unit prices.
pub const CLOUD_RUN_CPU_PER_HOUR: f64 = 0.024;
pub const CLOUD_RUN_MEMORY_PER_GB_HOUR: f64 = 0.0025;

/// Cloud Functions unit prices.
pub const CLOUD_FUNCTIONS_PER_MILLION_INVOCATIONS: f64 = 0.40;
pub const CLOUD_FUNCTIONS_PER_GB_SECOND: f64 = 0.0000025;

/// GKE cluster management fee per cluster-hour (standard and autopilot).
pub const GKE_CLUSTER_HOURLY: f64 = 0.10;

/// Load balancer forwarding-rule hourly price, any family.
pub const LOAD_BALANCER_HOURLY: f64 = 0.025;

/// Memorystore estimate per GB-hour.
pub const REDIS_PER_GB_HOUR: f64 = 0.10;

/// Spanner per node-hour.
pub const SPANNER_NODE_HOURLY: f64 = 0.90;

/// BigQuery flat monthly estimate per dataset (pay-per-use).
pub const BIGQUERY_DATASET_MONTHLY: f64 = 10.0;

/// Compute Engine price for a machine type. Unknown types fall back to
/// $0.10/hr at low confidence.
pub fn get_gcp_instance_price(machine_type: &str, _region: &str) -> PriceQuote {
    match COMPUTE_ENGINE_HOURLY.get(machine_type) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.10, PricingConfidence::Low),
    }
}

/// Cloud SQL price for a tier. Unknown tiers fall back to $0.05/hr.
pub fn get_gcp_database_price(tier: &str, _region: &str) -> PriceQuote {
    match CLOUD_SQL_HOURLY.get(tier) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.05, PricingConfidence::Low),
    }
}

/// Cloud Storage price per GB-month for a storage class. Unknown classes
/// fall back to the standard rate.
pub fn get_gcp_storage_price(storage_class: &str) -> (f64, PricingConfidence) {
    match CLOUD_STORAGE_GB_MONTH.get(storage_class) {
        Some(&per_gb) => (per_gb, PricingConfidence::High),
        None => (0.020, PricingConfidence::Low),
    }
}

/// GKE cluster management fee; identical for standard and autopilot.
pub fn get_gcp_kubernetes_price(_cluster_type: &str) -> PriceQuote {
    PriceQuote::hourly(GKE_CLUSTER_HOURLY, PricingConfidence::High)
}

/// Load balancer forwarding-rule price for a family.
pub fn get_gcp_load_balancer_price(_lb_type: &str) -> PriceQuote {
    PriceQuote::hourly(LOAD_BALANCER_HOURLY, PricingConfidence::High)
}

/// Memorystore Redis size string is `{TIER}-{N}GB`; unparseable sizes
/// assume 1 GB.
pub fn get_gcp_redis_memory_gb(size: &str) -> i64 {
    if !size.contains("GB") {
        return 1;
    }
    size.rsplit('-')
        .next()
        .and_then(|part| part.trim_end_matches("GB").parse().ok())
        .unwrap_or(1)
}

/// Spanner size string is `{N}nodes`, `{N}node` or `{N}PU` (1000 PU per
/// node equivalent).
pub fn get_gcp_spanner_node_count(size: &str) -> f64 {
    if let Some(pu) = size.strip_suffix("PU") {
        return pu.parse::<f64>().map(|p| p / 1000.0).unwrap_or(1.0);
    }
    size.trim_end_matches("nodes")
        .trim_end_matches("node")
        .parse()
        .unwrap_or(1.0)
}
