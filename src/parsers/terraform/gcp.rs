//! GCP Terraform resource handlers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::CanonicalResource;

use super::{capture_int, capture_str};

static PROVIDER_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)provider\s+"google"\s*\{[^}]*region\s*=\s*"([a-z0-9-]+)""#)
        .expect("valid regex")
});

/// Default GCP region from the provider block, else `us-central1`.
pub fn get_gcp_default_region(hcl_text: &str) -> String {
    PROVIDER_REGION
        .captures(hcl_text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "us-central1".to_string())
}

/// Region resolution: region > location > zone (normalized) > default.
/// A zone like `us-central1-a` maps to region `us-central1`.
fn resolve_region(resource_body: &str, default_region: &str) -> String {
    if let Some(region) = capture_str(resource_body, "region") {
        return region;
    }
    if let Some(location) = capture_str(resource_body, "location") {
        return location;
    }
    if let Some(zone) = capture_str(resource_body, "zone") {
        let parts: Vec<&str> = zone.split('-').collect();
        if parts.len() > 1 {
            return parts[..parts.len() - 1].join("-");
        }
        return zone;
    }
    default_region.to_string()
}

/// Parse one GCP resource block into canonical form.
pub fn parse_gcp_resource(
    resource_type: &str,
    resource_name: &str,
    resource_body: &str,
    default_region: &str,
    count: i64,
) -> Option<CanonicalResource> {
    let region = resolve_region(resource_body, default_region);

    match resource_type {
        "google_compute_instance" => {
            let machine_type =
                capture_str(resource_body, "machine_type").unwrap_or_else(|| "e2-micro".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-gce-{region}"),
                "gcp_compute_instance",
                resource_name,
                region,
                machine_type,
                count,
            ))
        }

        "google_sql_database_instance" => {
            let tier = capture_str(resource_body, "tier").unwrap_or_else(|| "db-f1-micro".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-sql-{region}"),
                "gcp_sql_database_instance",
                resource_name,
                region,
                tier,
                count,
            ))
        }

        "google_storage_bucket" => {
            let location = capture_str(resource_body, "location").unwrap_or_else(|| "US".to_string());
            let storage_class = capture_str(resource_body, "storage_class")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "standard".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-storage-{location}"),
                "gcp_storage_bucket",
                resource_name,
                location,
                storage_class,
                count,
            ))
        }

        "google_container_cluster" => {
            let autopilot = Regex::new(r"(?i)enable_autopilot\s*=\s*true")
                .ok()
                .map(|re| re.is_match(resource_body))
                .unwrap_or(false);
            Some(CanonicalResource::new(
                format!("{resource_name}-gke-{region}"),
                "gcp_container_cluster",
                resource_name,
                region,
                if autopilot { "autopilot_cluster" } else { "standard_cluster" },
                count,
            ))
        }

        "google_cloud_run_service" => {
            let location = capture_str(resource_body, "location").unwrap_or_else(|| region.clone());
            Some(CanonicalResource::new(
                format!("{resource_name}-run-{location}"),
                "gcp_cloud_run_service",
                resource_name,
                location,
                "serverless",
                count,
            ))
        }

        "google_cloudfunctions_function" => {
            let runtime =
                capture_str(resource_body, "runtime").unwrap_or_else(|| "python39".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-functions-{region}"),
                "gcp_cloudfunctions_function",
                resource_name,
                region,
                runtime,
                count,
            ))
        }

        "google_compute_global_forwarding_rule"
        | "google_compute_url_map"
        | "google_compute_target_http_proxy"
        | "google_compute_target_https_proxy" => {
            let lb_type = if resource_type.contains("https") {
                "ssl_lb"
            } else if resource_type.contains("tcp") {
                "tcp_lb"
            } else if resource_type.contains("udp") {
                "udp_lb"
            } else {
                "http_lb"
            };
            Some(CanonicalResource::new(
                format!("{resource_name}-lb-{region}"),
                "gcp_load_balancer",
                resource_name,
                region,
                lb_type,
                count,
            ))
        }

        "google_bigquery_dataset" => {
            let location = capture_str(resource_body, "location").unwrap_or_else(|| region.clone());
            Some(CanonicalResource::new(
                format!("{resource_name}-bigquery-{location}"),
                "gcp_bigquery_dataset",
                resource_name,
                location,
                "standard",
                count,
            ))
        }

        "google_compute_disk" => {
            let disk_type =
                capture_str(resource_body, "type").unwrap_or_else(|| "pd-standard".to_string());
            let size_gb = capture_int(resource_body, "size").unwrap_or(100);
            let mut metadata = HashMap::new();
            metadata.insert("size_gb".to_string(), size_gb.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-disk-{region}"),
                    "gcp_compute_disk",
                    resource_name,
                    region,
                    format!("{disk_type}-{size_gb}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "google_filestore_instance" => {
            let tier = capture_str(resource_body, "tier")
                .map(|t| t.to_uppercase())
                .unwrap_or_else(|| "BASIC_HDD".to_string());
            let capacity = capture_int(resource_body, "capacity_gb").unwrap_or(1024);
            let mut metadata = HashMap::new();
            metadata.insert("capacity_gb".to_string(), capacity.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-filestore-{region}"),
                    "gcp_filestore_instance",
                    resource_name,
                    region,
                    format!("{tier}-{capacity}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "google_pubsub_topic" => Some(CanonicalResource::new(
            format!("{resource_name}-pubsub-{region}"),
            "gcp_pubsub_topic",
            resource_name,
            region,
            "topic",
            count,
        )),

        "google_dataflow_job" => {
            let machine_type = capture_str(resource_body, "machine_type")
                .unwrap_or_else(|| "n1-standard-1".to_string());
            let max_workers = capture_int(resource_body, "max_workers").unwrap_or(1);
            let mut metadata = HashMap::new();
            metadata.insert("max_workers".to_string(), max_workers.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-dataflow-{region}"),
                    "gcp_dataflow_job",
                    resource_name,
                    region,
                    format!("{machine_type}-{max_workers}workers"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "google_composer_environment" => {
            let node_count = capture_int(resource_body, "node_count").unwrap_or(3);
            let machine_type = capture_str(resource_body, "machine_type")
                .unwrap_or_else(|| "n1-standard-1".to_string());
            let mut metadata = HashMap::new();
            metadata.insert("node_count".to_string(), node_count.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-composer-{region}"),
                    "gcp_composer_environment",
                    resource_name,
                    region,
                    format!("{machine_type}-{node_count}nodes"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "google_spanner_instance" => {
            let size = if let Some(pu) = capture_int(resource_body, "processing_units") {
                format!("{pu}PU")
            } else if let Some(nodes) = capture_int(resource_body, "num_nodes") {
                format!("{nodes}nodes")
            } else {
                "1node".to_string()
            };
            Some(CanonicalResource::new(
                format!("{resource_name}-spanner-{region}"),
                "gcp_spanner_instance",
                resource_name,
                region,
                size,
                count,
            ))
        }

        "google_notebooks_instance" => {
            let machine_type = capture_str(resource_body, "machine_type")
                .unwrap_or_else(|| "n1-standard-4".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-notebooks-{region}"),
                "gcp_notebooks_instance",
                resource_name,
                region,
                machine_type,
                count,
            ))
        }

        "google_redis_instance" => {
            let tier = capture_str(resource_body, "tier")
                .map(|t| t.to_uppercase())
                .unwrap_or_else(|| "BASIC".to_string());
            let memory = capture_int(resource_body, "memory_size_gb").unwrap_or(1);
            Some(CanonicalResource::new(
                format!("{resource_name}-redis-{region}"),
                "gcp_redis_instance",
                resource_name,
                region,
                format!("{tier}-{memory}GB"),
                count,
            ))
        }

        "google_compute_security_policy" => Some(CanonicalResource::new(
            format!("{resource_name}-armor-global"),
            "gcp_cloud_armor",
            resource_name,
            "global",
            "security_policy",
            count,
        )),

        _ => None,
    }
}
