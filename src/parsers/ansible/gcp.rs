//! GCP Ansible module handlers.

use std::collections::HashMap;

use crate::domain::CanonicalResource;

use super::{nested_str, param_i64, param_str};

/// Parse one GCP Ansible task into canonical form.
pub fn parse_gcp_ansible_task(
    module_name: &str,
    params: &serde_yaml::Mapping,
    task_name: &str,
    default_region: &str,
) -> Option<CanonicalResource> {
    let region = param_str(params, "region", default_region);

    match module_name {
        "gcp_compute_instance" | "gce_instance" => {
            let machine_type = param_str(params, "machine_type", "n1-standard-1");
            Some(CanonicalResource::new(
                format!("{task_name}-{machine_type}-{region}"),
                "gcp_compute_instance",
                task_name,
                region,
                machine_type,
                1,
            ))
        }

        "gcp_compute_instance_group" => {
            let machine_type = nested_str(params, "template", "machine_type", "n1-standard-1");
            let size = param_i64(params, "size", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-ig-{machine_type}-{region}"),
                "gcp_compute_instance",
                task_name,
                region,
                machine_type,
                size,
            ))
        }

        "gcp_container_cluster" => {
            let node_count = param_i64(params, "initial_node_count", 1);
            let machine_type = nested_str(params, "node_config", "machine_type", "e2-medium");
            let mut metadata = HashMap::new();
            metadata.insert("num_nodes".to_string(), node_count.into());
            metadata.insert("machine_type".to_string(), machine_type.into());
            Some(
                CanonicalResource::new(
                    format!("{task_name}-gke-{region}"),
                    "gcp_container_cluster",
                    task_name,
                    region,
                    "standard_cluster",
                    node_count,
                )
                .with_metadata(metadata),
            )
        }

        "gcp_cloudfunctions_function" => {
            let memory = param_i64(params, "memory", 256);
            let runtime = param_str(params, "runtime", "python39");
            Some(CanonicalResource::new(
                format!("{task_name}-cf-{memory}MB-{runtime}-{region}"),
                "gcp_cloudfunctions_function",
                task_name,
                region,
                runtime,
                1,
            ))
        }

        "gcp_run_service" => Some(CanonicalResource::new(
            format!("{task_name}-run-{region}"),
            "gcp_cloud_run_service",
            task_name,
            region,
            "serverless",
            1,
        )),

        "gcp_sql_instance" => {
            let tier = nested_str(params, "settings", "tier", "db-n1-standard-1");
            Some(CanonicalResource::new(
                format!("{task_name}-sql-{tier}-{region}"),
                "gcp_sql_database_instance",
                task_name,
                region,
                tier,
                1,
            ))
        }

        "gcp_bigquery_dataset" => Some(CanonicalResource::new(
            format!("{task_name}-bigquery-{region}"),
            "gcp_bigquery_dataset",
            task_name,
            region,
            "standard",
            1,
        )),

        "gcp_storage_bucket" => {
            let storage_class = param_str(params, "storage_class", "STANDARD").to_lowercase();
            Some(CanonicalResource::new(
                format!("{task_name}-storage-{region}"),
                "gcp_storage_bucket",
                task_name,
                region,
                storage_class,
                1,
            ))
        }

        "gcp_pubsub_topic" => Some(CanonicalResource::new(
            format!("{task_name}-pubsub-{region}"),
            "gcp_pubsub_topic",
            task_name,
            region,
            "topic",
            1,
        )),

        "gcp_redis_instance" => {
            let tier = param_str(params, "tier", "BASIC").to_uppercase();
            let memory = param_i64(params, "memory_size_gb", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-redis-{region}"),
                "gcp_redis_instance",
                task_name,
                region,
                format!("{tier}-{memory}GB"),
                1,
            ))
        }

        "gcp_spanner_instance" => {
            let nodes = param_i64(params, "node_count", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-spanner-{region}"),
                "gcp_spanner_instance",
                task_name,
                region,
                format!("{nodes}nodes"),
                1,
            ))
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(yaml: &str) -> serde_yaml::Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_compute_instance_defaults() {
        let resource =
            parse_gcp_ansible_task("gcp_compute_instance", &params("{}"), "vm", "us-central1")
                .unwrap();
        assert_eq!(resource.resource_type, "gcp_compute_instance");
        assert_eq!(resource.size, "n1-standard-1");
    }

    #[test]
    fn test_instance_group_size_becomes_count() {
        let body = r#"
template:
  machine_type: e2-standard-4
size: 3
"#;
        let resource =
            parse_gcp_ansible_task("gcp_compute_instance_group", &params(body), "grp", "us-central1")
                .unwrap();
        assert_eq!(resource.count, 3);
        assert_eq!(resource.size, "e2-standard-4");
    }

    #[test]
    fn test_sql_tier_nested_in_settings() {
        let body = r#"
settings:
  tier: db-n1-standard-2
"#;
        let resource =
            parse_gcp_ansible_task("gcp_sql_instance", &params(body), "db", "us-central1").unwrap();
        assert_eq!(resource.size, "db-n1-standard-2");
    }

    #[test]
    fn test_redis_size_composition() {
        let body = r#"
tier: standard_ha
memory_size_gb: 4
"#;
        let resource =
            parse_gcp_ansible_task("gcp_redis_instance", &params(body), "cache", "us-central1")
                .unwrap();
        assert_eq!(resource.size, "STANDARD_HA-4GB");
    }

    #[test]
    fn test_unknown_module_returns_none() {
        assert!(parse_gcp_ansible_task("gcp_dns_zone", &params("{}"), "z", "us-central1").is_none());
    }
}
