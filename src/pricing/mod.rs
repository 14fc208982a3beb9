//! Pricing catalog: static per-cloud tables, live adapters, and the
//! fallback factory. Every lookup is total; unknown SKUs yield conservative
//! low-confidence quotes.

pub mod aws;
pub mod azure;
pub mod factory;
pub mod gcp;
pub mod live;

pub use factory::PricingFactory;
