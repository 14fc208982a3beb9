//! IaC parsers producing the canonical resource model.
//!
//! Parsing is total: unknown resource kinds are skipped, malformed input
//! yields an empty model and a warning log. Nothing here ever surfaces an
//! error to the analysis path.

pub mod ansible;
pub mod terraform;

use crate::domain::{CanonicalResourceModel, IacType};

pub use ansible::parse_ansible_to_crmodel;
pub use terraform::parse_terraform_to_crmodel;

/// Parse an IaC document of the given format.
///
/// Formats without a parser (`helm`, `k8s`, `pulumi`) yield an empty model.
pub fn parse(payload_text: &str, format: IacType) -> CanonicalResourceModel {
    match format {
        IacType::Terraform => parse_terraform_to_crmodel(payload_text),
        IacType::Ansible => parse_ansible_to_crmodel(payload_text),
        _ => CanonicalResourceModel::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_formats_yield_empty_model() {
        for format in [IacType::Helm, IacType::K8s, IacType::Pulumi] {
            assert!(parse("whatever", format).is_empty());
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let hcl = r#"
resource "aws_instance" "a" { instance_type = "t3.micro" }
resource "aws_s3_bucket" "b" {}
"#;
        let first = parse(hcl, IacType::Terraform);
        let second = parse(hcl, IacType::Terraform);
        assert_eq!(first, second);
    }
}
