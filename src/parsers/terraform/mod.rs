//! Terraform HCL parser for multi-cloud infrastructure.
//!
//! Extracts `resource "<type>" "<name>" { ... }` blocks with a regex over the
//! top-level statements and routes each block to a cloud-specific handler.
//! Nested-block recursion is deliberately not attempted; handlers perform
//! bounded attribute lookups inside the matched body.

mod aws;
mod azure;
mod gcp;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{CanonicalResource, CanonicalResourceModel};

pub use aws::{get_aws_default_region, parse_aws_resource};
pub use azure::{get_azure_default_location, parse_azure_resource};
pub use gcp::{get_gcp_default_region, parse_gcp_resource};

static RESOURCE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"resource\s+"([^"]+)"\s+"([^"]+)"\s*\{([\s\S]*?)\}"#).expect("valid regex")
});

static COUNT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)count\s*=\s*([0-9]+)").expect("valid regex"));

/// Parse Terraform HCL text into a canonical resource model.
///
/// Unsupported resource kinds are skipped; malformed input yields whatever
/// blocks matched. Never fails.
pub fn parse_terraform_to_crmodel(hcl_text: &str) -> CanonicalResourceModel {
    let aws_default_region = get_aws_default_region(hcl_text);
    let gcp_default_region = get_gcp_default_region(hcl_text);
    let azure_default_location = get_azure_default_location(hcl_text);

    let mut resources: Vec<CanonicalResource> = Vec::new();

    for captures in RESOURCE_BLOCK.captures_iter(hcl_text) {
        let resource_type = &captures[1];
        let resource_name = &captures[2];
        let resource_body = &captures[3];

        // count = N applies to every resource kind; it does not duplicate
        // the canonical resource.
        let count = COUNT_ATTR
            .captures(resource_body)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1);

        let resource = if resource_type.starts_with("aws_") {
            parse_aws_resource(resource_type, resource_name, resource_body, &aws_default_region, count)
        } else if resource_type.starts_with("google_") {
            parse_gcp_resource(resource_type, resource_name, resource_body, &gcp_default_region, count)
        } else if resource_type.starts_with("azurerm_") {
            parse_azure_resource(
                resource_type,
                resource_name,
                resource_body,
                &azure_default_location,
                count,
            )
        } else {
            None
        };

        if let Some(resource) = resource {
            resources.push(resource);
        }
    }

    CanonicalResourceModel::new(resources)
}

/// Capture a quoted string attribute from a resource body.
pub(crate) fn capture_str(body: &str, pattern: &str) -> Option<String> {
    Regex::new(&format!(r#"(?i){}\s*=\s*"([^"]+)""#, pattern))
        .ok()?
        .captures(body)
        .map(|c| c[1].to_string())
}

/// Capture an integer attribute from a resource body.
pub(crate) fn capture_int(body: &str, pattern: &str) -> Option<i64> {
    Regex::new(&format!(r#"(?i){}\s*=\s*"?([0-9]+)"?"#, pattern))
        .ok()?
        .captures(body)
        .and_then(|c| c[1].parse().ok())
}
