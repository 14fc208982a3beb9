//! Ansible playbook parser for multi-cloud infrastructure.
//!
//! Accepts a single play or a list of plays, walks `tasks` then `handlers`,
//! treats the first non-reserved key of a task as the module invocation, and
//! routes modules to per-cloud handlers by name prefix.

mod aws;
mod azure;
mod gcp;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value as Yaml;
use tracing::warn;

use crate::domain::{CanonicalResource, CanonicalResourceModel};

pub use aws::parse_aws_ansible_task;
pub use azure::parse_azure_ansible_task;
pub use gcp::parse_gcp_ansible_task;

/// Task keys that are never module names.
const RESERVED_KEYS: [&str; 6] = ["name", "vars", "when", "loop", "register", "tags"];

static TEMPLATE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^}]+)\s*\}\}").expect("valid regex"));

/// Parse Ansible playbook YAML into a canonical resource model.
///
/// Malformed YAML yields an empty model plus a warning log; unknown modules
/// are skipped.
pub fn parse_ansible_to_crmodel(playbook_content: &str) -> CanonicalResourceModel {
    let parsed: Yaml = match serde_yaml::from_str(playbook_content) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "failed to parse Ansible YAML, returning empty model");
            return CanonicalResourceModel::empty();
        }
    };

    let plays: Vec<Yaml> = match parsed {
        Yaml::Sequence(seq) => seq,
        other @ Yaml::Mapping(_) => vec![other],
        _ => return CanonicalResourceModel::empty(),
    };

    let aws_default_region = get_aws_default_region(playbook_content);
    let gcp_default_region = get_gcp_default_region(playbook_content);
    let azure_default_location = get_azure_default_location(playbook_content);

    let mut resources: Vec<CanonicalResource> = Vec::new();

    for play in &plays {
        let Yaml::Mapping(play_map) = play else { continue };
        let playbook_vars = yaml_get(play_map, "vars")
            .cloned()
            .unwrap_or(Yaml::Mapping(Default::default()));

        for section in ["tasks", "handlers"] {
            let Some(Yaml::Sequence(tasks)) = yaml_get(play_map, section) else {
                continue;
            };
            for task in tasks {
                if let Some(resource) = parse_task_to_resource(
                    task,
                    &playbook_vars,
                    &aws_default_region,
                    &gcp_default_region,
                    &azure_default_location,
                ) {
                    resources.push(resource);
                }
            }
        }
    }

    CanonicalResourceModel::new(resources)
}

fn parse_task_to_resource(
    task: &Yaml,
    playbook_vars: &Yaml,
    aws_default_region: &str,
    gcp_default_region: &str,
    azure_default_location: &str,
) -> Option<CanonicalResource> {
    let Yaml::Mapping(task_map) = task else {
        return None;
    };

    let task_name = yaml_get(task_map, "name")
        .and_then(|v| v.as_str())
        .unwrap_or("unnamed")
        .to_string();

    // Merge playbook vars with task vars; task vars win.
    let mut merged_vars = serde_yaml::Mapping::new();
    if let Yaml::Mapping(map) = playbook_vars {
        for (k, v) in map {
            merged_vars.insert(k.clone(), v.clone());
        }
    }
    if let Some(Yaml::Mapping(map)) = yaml_get(task_map, "vars") {
        for (k, v) in map {
            merged_vars.insert(k.clone(), v.clone());
        }
    }

    for (key, value) in task_map {
        let Some(module_name) = key.as_str() else { continue };
        if RESERVED_KEYS.contains(&module_name) {
            continue;
        }
        let Yaml::Mapping(params) = value else { continue };

        let resolved = resolve_params(params, &merged_vars);

        if module_name.starts_with("ec2_")
            || module_name.starts_with("aws_")
            || matches!(
                module_name,
                "lambda_function" | "rds_instance" | "rds" | "s3_bucket" | "aws_s3"
            )
        {
            return parse_aws_ansible_task(module_name, &resolved, &task_name, aws_default_region);
        }
        if module_name.starts_with("gcp_") || module_name.starts_with("gce_") {
            return parse_gcp_ansible_task(module_name, &resolved, &task_name, gcp_default_region);
        }
        if module_name.starts_with("azure_") || module_name.starts_with("azurerm_") {
            return parse_azure_ansible_task(
                module_name,
                &resolved,
                &task_name,
                azure_default_location,
            );
        }
    }

    None
}

/// Apply simple `{{ var }}` substitution to top-level string parameters.
/// Nested or filtered templates are left as-is.
fn resolve_params(params: &serde_yaml::Mapping, vars: &serde_yaml::Mapping) -> serde_yaml::Mapping {
    let mut resolved = serde_yaml::Mapping::new();
    for (key, value) in params {
        let new_value = match value {
            Yaml::String(s) if s.contains("{{") => resolve_template(s, vars),
            other => other.clone(),
        };
        resolved.insert(key.clone(), new_value);
    }
    resolved
}

fn resolve_template(value: &str, vars: &serde_yaml::Mapping) -> Yaml {
    if let Some(captures) = TEMPLATE_VAR.captures(value) {
        let var_name = captures[1].trim();
        if let Some(substituted) = yaml_get(vars, var_name) {
            return substituted.clone();
        }
    }
    Yaml::String(value.to_string())
}

/// String-keyed mapping lookup.
pub(crate) fn yaml_get<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a Yaml> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Accessors shared by the per-cloud handlers.
pub(crate) fn param_str(params: &serde_yaml::Mapping, key: &str, default: &str) -> String {
    yaml_get(params, key)
        .and_then(|v| match v {
            Yaml::String(s) => Some(s.clone()),
            Yaml::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn param_i64(params: &serde_yaml::Mapping, key: &str, default: i64) -> i64 {
    yaml_get(params, key).and_then(|v| v.as_i64()).unwrap_or(default)
}

pub(crate) fn nested_str(params: &serde_yaml::Mapping, outer: &str, key: &str, default: &str) -> String {
    yaml_get(params, outer)
        .and_then(|v| v.as_mapping())
        .and_then(|m| yaml_get(m, key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn scan_region(content: &str, patterns: &[&str], fallback: &str) -> String {
    for pattern in patterns {
        if let Ok(re) = Regex::new(&format!(r#"(?i){pattern}:\s*["']?([a-z0-9-]+)["']?"#)) {
            if let Some(captures) = re.captures(content) {
                return captures[1].to_string();
            }
        }
    }
    fallback.to_string()
}

/// Default AWS region scraped from playbook variables.
pub fn get_aws_default_region(content: &str) -> String {
    scan_region(content, &["aws_region", "region", "AWS_DEFAULT_REGION"], "us-east-1")
}

/// Default GCP region scraped from playbook variables.
pub fn get_gcp_default_region(content: &str) -> String {
    scan_region(content, &["gcp_region", "region"], "us-central1")
}

/// Default Azure location scraped from playbook variables.
pub fn get_azure_default_location(content: &str) -> String {
    scan_region(content, &["azure_location", "location"], "eastus")
}
