//! Live pricing adapters for the provider pricing endpoints.
//!
//! Each adapter issues a single bounded HTTP call with a 10-second timeout
//! and returns `Ok(None)` when pricing is unavailable; the factory decides
//! what to fall back to.

mod aws;
mod azure;
mod gcp;

use std::time::Duration;

pub use aws::AwsLivePricingAdapter;
pub use azure::AzureLivePricingAdapter;
pub use gcp::GcpLivePricingAdapter;

/// Timeout applied to every live pricing call.
pub const LIVE_PRICING_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(LIVE_PRICING_TIMEOUT)
        .build()
        .unwrap_or_default()
}
