//! Static Azure pricing tables (pay-as-you-go, East US reference prices).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::{PriceQuote, PricingConfidence};

/// Virtual machine hourly prices by size.
static VM_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // B-series (burstable)
        ("Standard_B1s", 0.0104),
        ("Standard_B1ms", 0.0207),
        ("Standard_B2s", 0.0416),
        ("Standard_B2ms", 0.0832),
        ("Standard_B4ms", 0.166),
        ("Standard_B8ms", 0.333),
        // D-series (general purpose)
        ("Standard_D2s_v3", 0.096),
        ("Standard_D4s_v3", 0.192),
        ("Standard_D8s_v3", 0.384),
        ("Standard_D16s_v3", 0.768),
        ("Standard_D32s_v3", 1.536),
        ("Standard_D48s_v3", 2.304),
        ("Standard_D64s_v3", 3.072),
        // E-series (memory optimized)
        ("Standard_E2s_v3", 0.126),
        ("Standard_E4s_v3", 0.252),
        ("Standard_E8s_v3", 0.504),
        ("Standard_E16s_v3", 1.008),
        ("Standard_E32s_v3", 2.016),
        // F-series (compute optimized)
        ("Standard_F2s_v2", 0.085),
        ("Standard_F4s_v2", 0.169),
        ("Standard_F8s_v2", 0.338),
        ("Standard_F16s_v2", 0.677),
        ("Standard_F32s_v2", 1.354),
    ])
});

/// SQL Database DTU-tier hourly prices.
static SQL_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("Basic", 0.0068),
        ("S0", 0.0203),
        ("S1", 0.0406),
        ("S2", 0.102),
        ("S3", 0.203),
        ("S4", 0.406),
        ("P1", 0.625),
        ("P2", 1.25),
        ("P4", 2.50),
        ("P6", 5.00),
    ])
});

/// Blob storage per GB-month by access tier.
static STORAGE_GB_MONTH: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("Hot", 0.0184),
        ("Cool", 0.0100),
        ("Archive", 0.00099),
        ("Premium_LRS", 0.15),
        ("Premium_ZRS", 0.188),
    ])
});

/// App Service plan hourly prices by SKU.
static APP_SERVICE_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("F1", 0.0),
        ("B1", 0.075),
        ("B2", 0.15),
        ("B3", 0.30),
        ("S1", 0.10),
        ("S2", 0.20),
        ("S3", 0.40),
        ("P1v2", 0.146),
        ("P2v2", 0.292),
        ("P3v2", 0.584),
    ])
});

/// Redis cache hourly prices by capacity tier.
static REDIS_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("C0", 0.02),
        ("C1", 0.08),
        ("C2", 0.188),
        ("C3", 0.375),
        ("C4", 0.75),
        ("C5", 1.50),
        ("C6", 3.0),
    ])
});

/// Functions consumption plan unit prices.
pub const FUNCTIONS_PER_MILLION_EXECUTIONS: f64 = 0.20;
pub const FUNCTIONS_PER_GB_SECOND: f64 = 0.000016;

/// Premium Functions plan hourly prices.
static FUNCTIONS_PREMIUM_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([("EP1", 0.169), ("EP2", 0.338), ("EP3", 0.676)])
});

/// Standard load balancer hourly price; Basic is free.
pub const LB_STANDARD_HOURLY: f64 = 0.025;

/// Cosmos DB unit prices.
pub const COSMOS_PER_100RU_HOUR: f64 = 0.008;
pub const COSMOS_STORAGE_PER_GB_MONTH: f64 = 0.25;

/// Flexible-server (PostgreSQL/MySQL) hourly prices by compute SKU.
static FLEXIBLE_SERVER_HOURLY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("B_Gen5_1", 0.034),
        ("B_Gen5_2", 0.068),
        ("GP_Gen5_2", 0.175),
        ("GP_Gen5_4", 0.351),
        ("GP_Gen5_8", 0.702),
        ("MO_Gen5_2", 0.25),
        ("MO_Gen5_4", 0.50),
    ])
});

/// SQL Managed Instance estimate per vCore-hour.
pub const SQLMI_PER_VCORE_HOUR: f64 = 0.25;

/// VM price by size. Unknown sizes fall back to $0.10/hr at low confidence.
pub fn get_azure_vm_price(vm_size: &str, _region: &str) -> PriceQuote {
    match VM_HOURLY.get(vm_size) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.10, PricingConfidence::Low),
    }
}

/// SQL Database price by DTU tier. Unknown tiers fall back to S0-ish rates.
pub fn get_azure_sql_price(tier: &str, _region: &str) -> PriceQuote {
    match SQL_HOURLY.get(tier) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.05, PricingConfidence::Low),
    }
}

/// Blob storage per GB-month for an access tier; the size string emitted by
/// the parser is `{tier}_{replication}` and only the tier selects the price.
pub fn get_azure_storage_price(size: &str) -> (f64, PricingConfidence) {
    // Premium tiers keep the replication suffix as part of the key.
    if let Some(&per_gb) = STORAGE_GB_MONTH.get(size) {
        return (per_gb, PricingConfidence::High);
    }
    let tier = size.split('_').next().unwrap_or(size);
    match tier {
        "Standard" | "Hot" => (0.0184, PricingConfidence::High),
        "Cool" => (0.0100, PricingConfidence::High),
        "Archive" => (0.00099, PricingConfidence::High),
        "Premium" => (0.15, PricingConfidence::Medium),
        _ => (0.0184, PricingConfidence::Low),
    }
}

/// App Service plan price by SKU. Tier_Size composites fall back on the
/// size segment.
pub fn get_azure_app_service_price(sku: &str) -> PriceQuote {
    if let Some(&hourly) = APP_SERVICE_HOURLY.get(sku) {
        return PriceQuote::hourly(hourly, PricingConfidence::High);
    }
    if let Some(size) = sku.split('_').nth(1) {
        if let Some(&hourly) = APP_SERVICE_HOURLY.get(size) {
            return PriceQuote::hourly(hourly, PricingConfidence::High);
        }
    }
    PriceQuote::hourly(0.10, PricingConfidence::Low)
}

/// Premium Functions plan price by SKU; consumption plans are priced by
/// execution in the simulator.
pub fn get_azure_functions_premium_price(sku: &str) -> PriceQuote {
    match FUNCTIONS_PREMIUM_HOURLY.get(sku) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.169, PricingConfidence::Low),
    }
}

/// Load balancer price; parser size is the SKU name (`Basic`/`Standard`).
pub fn get_azure_load_balancer_price(sku: &str) -> PriceQuote {
    if sku.eq_ignore_ascii_case("basic") {
        PriceQuote::hourly(0.0, PricingConfidence::High)
    } else {
        PriceQuote::hourly(LB_STANDARD_HOURLY, PricingConfidence::High)
    }
}

/// Redis price; parser size is `{sku}_{family}{capacity}` (e.g.
/// `Standard_C1`), only the capacity tier selects the price.
pub fn get_azure_redis_price(size: &str) -> PriceQuote {
    let tier = size.rsplit('_').next().unwrap_or(size);
    match REDIS_HOURLY.get(tier) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.08, PricingConfidence::Low),
    }
}

/// Flexible-server price; parser size is `{sku}-{storage}GB` and only the
/// compute SKU selects the price.
pub fn get_azure_flexible_server_price(size: &str) -> PriceQuote {
    let sku = size.rsplit_once('-').map(|(sku, _)| sku).unwrap_or(size);
    match FLEXIBLE_SERVER_HOURLY.get(sku) {
        Some(&hourly) => PriceQuote::hourly(hourly, PricingConfidence::High),
        None => PriceQuote::hourly(0.07, PricingConfidence::Medium),
    }
}

/// SQL Managed Instance price from the vCore count.
pub fn get_azure_sqlmi_price(vcores: i64) -> PriceQuote {
    PriceQuote::hourly(vcores as f64 * SQLMI_PER_VCORE_HOUR, PricingConfidence::Medium)
}

/// Cosmos DB monthly price from provisioned throughput and storage.
pub fn get_azure_cosmos_price(throughput_ru: i64, storage_gb: f64) -> PriceQuote {
    let throughput_monthly = (throughput_ru as f64 / 100.0) * COSMOS_PER_100RU_HOUR * 730.0;
    let storage_monthly = storage_gb * COSMOS_STORAGE_PER_GB_MONTH;
    PriceQuote::monthly(throughput_monthly + storage_monthly, PricingConfidence::Medium)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vm_size() {
        let quote = get_azure_vm_price("Standard_D2s_v3", "eastus");
        assert_eq!(quote.hourly_price, 0.096);
        assert_eq!(quote.confidence, PricingConfidence::High);
    }

    #[test]
    fn test_unknown_vm_fallback() {
        let quote = get_azure_vm_price("Standard_Z99", "eastus");
        assert_eq!(quote.hourly_price, 0.10);
        assert_eq!(quote.confidence, PricingConfidence::Low);
    }

    #[test]
    fn test_sql_tiers() {
        assert_eq!(get_azure_sql_price("S0", "eastus").hourly_price, 0.0203);
        assert_eq!(get_azure_sql_price("P2", "eastus").hourly_price, 1.25);
    }

    #[test]
    fn test_storage_tier_from_composite_size() {
        let (price, confidence) = get_azure_storage_price("Standard_LRS");
        assert_eq!(price, 0.0184);
        assert_eq!(confidence, PricingConfidence::High);
        assert_eq!(get_azure_storage_price("Premium_ZRS").0, 0.188);
    }

    #[test]
    fn test_app_service_composite_sku() {
        assert_eq!(get_azure_app_service_price("S1").hourly_price, 0.10);
        assert_eq!(get_azure_app_service_price("Standard_S1").hourly_price, 0.10);
        assert_eq!(get_azure_app_service_price("F1").hourly_price, 0.0);
    }

    #[test]
    fn test_basic_lb_is_free() {
        assert_eq!(get_azure_load_balancer_price("Basic").hourly_price, 0.0);
        assert_eq!(get_azure_load_balancer_price("Standard").hourly_price, 0.025);
    }

    #[test]
    fn test_redis_capacity_tier() {
        assert_eq!(get_azure_redis_price("Standard_C2").hourly_price, 0.188);
        assert_eq!(get_azure_redis_price("C1").hourly_price, 0.08);
    }

    #[test]
    fn test_flexible_server_sku_from_composite_size() {
        assert_eq!(get_azure_flexible_server_price("GP_Gen5_4-10GB").hourly_price, 0.351);
        let quote = get_azure_flexible_server_price("X_Unknown_9-5GB");
        assert_eq!(quote.hourly_price, 0.07);
        assert_eq!(quote.confidence, PricingConfidence::Medium);
    }

    #[test]
    fn test_sqlmi_vcore_pricing() {
        let quote = get_azure_sqlmi_price(4);
        assert!((quote.hourly_price - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosmos_default_assumptions() {
        let quote = get_azure_cosmos_price(400, 10.0);
        let expected = (400.0 / 100.0) * 0.008 * 730.0 + 10.0 * 0.25;
        assert!((quote.monthly_price - expected).abs() < 1e-9);
    }
}
