//! Azure Terraform resource handlers.

use std::collections::HashMap;

use regex::Regex;

use crate::domain::CanonicalResource;

use super::{capture_int, capture_str};

/// The azurerm provider block carries no default location; `eastus` is the
/// conventional fallback.
pub fn get_azure_default_location(_hcl_text: &str) -> String {
    "eastus".to_string()
}

/// Capture an attribute nested inside a named block, e.g.
/// `default_node_pool { vm_size = "..." }`.
fn capture_nested_str(body: &str, block: &str, attr: &str) -> Option<String> {
    Regex::new(&format!(r#"(?is){block}\s*\{{[^}}]*{attr}\s*=\s*"([^"]+)""#))
        .ok()?
        .captures(body)
        .map(|c| c[1].to_string())
}

fn capture_nested_int(body: &str, block: &str, attr: &str) -> Option<i64> {
    Regex::new(&format!(r#"(?is){block}\s*\{{[^}}]*{attr}\s*=\s*([0-9]+)"#))
        .ok()?
        .captures(body)
        .and_then(|c| c[1].parse().ok())
}

/// Parse one Azure resource block into canonical form.
pub fn parse_azure_resource(
    resource_type: &str,
    resource_name: &str,
    resource_body: &str,
    default_location: &str,
    count: i64,
) -> Option<CanonicalResource> {
    let location =
        capture_str(resource_body, "location").unwrap_or_else(|| default_location.to_string());

    match resource_type {
        "azurerm_virtual_machine" | "azurerm_linux_virtual_machine" | "azurerm_windows_virtual_machine" => {
            let vm_size =
                capture_str(resource_body, "vm_size").unwrap_or_else(|| "Standard_B1s".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-{vm_size}-{location}"),
                "azure_virtual_machine",
                resource_name,
                location,
                vm_size,
                count,
            ))
        }

        "azurerm_mssql_server" | "azurerm_sql_server" => Some(CanonicalResource::new(
            format!("{resource_name}-sql-server-{location}"),
            "azure_sql_server",
            resource_name,
            location,
            "server",
            count,
        )),

        "azurerm_mssql_database" | "azurerm_sql_database" => {
            let sku = capture_str(resource_body, "sku_name").unwrap_or_else(|| "S0".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-sqldb-{location}"),
                "azure_sql_database",
                resource_name,
                location,
                sku,
                count,
            ))
        }

        "azurerm_storage_account" => {
            let tier =
                capture_str(resource_body, "account_tier").unwrap_or_else(|| "Standard".to_string());
            let replication = capture_str(resource_body, "account_replication_type")
                .unwrap_or_else(|| "LRS".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-storage-{location}"),
                "azure_storage_account",
                resource_name,
                location,
                format!("{tier}_{replication}"),
                count,
            ))
        }

        "azurerm_kubernetes_cluster" => {
            let vm_size = capture_nested_str(resource_body, "default_node_pool", "vm_size")
                .unwrap_or_else(|| "Standard_DS2_v2".to_string());
            let node_count =
                capture_nested_int(resource_body, "default_node_pool", "node_count").unwrap_or(3);
            let mut metadata = HashMap::new();
            metadata.insert("node_count".to_string(), node_count.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-aks-{location}"),
                    "azure_kubernetes_cluster",
                    resource_name,
                    location,
                    format!("{vm_size}-{node_count}nodes"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_app_service_plan" | "azurerm_service_plan" => {
            let sku = if let Some(sku_name) = capture_str(resource_body, "sku_name") {
                sku_name
            } else {
                let tier = capture_nested_str(resource_body, "sku", "tier");
                let size = capture_nested_str(resource_body, "sku", "size");
                match (tier, size) {
                    (Some(tier), Some(size)) => format!("{tier}_{size}"),
                    _ => "B1".to_string(),
                }
            };
            Some(CanonicalResource::new(
                format!("{resource_name}-appplan-{location}"),
                "azure_app_service_plan",
                resource_name,
                location,
                sku,
                count,
            ))
        }

        "azurerm_app_service" | "azurerm_linux_web_app" | "azurerm_windows_web_app" => {
            Some(CanonicalResource::new(
                format!("{resource_name}-webapp-{location}"),
                "azure_web_app",
                resource_name,
                location,
                "webapp",
                count,
            ))
        }

        "azurerm_function_app" | "azurerm_linux_function_app" | "azurerm_windows_function_app" => {
            Some(CanonicalResource::new(
                format!("{resource_name}-function-{location}"),
                "azure_function_app",
                resource_name,
                location,
                "function",
                count,
            ))
        }

        "azurerm_lb" => {
            let sku = capture_str(resource_body, "sku").unwrap_or_else(|| "Basic".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-lb-{location}"),
                "azure_load_balancer",
                resource_name,
                location,
                sku,
                count,
            ))
        }

        "azurerm_redis_cache" => {
            let family = capture_str(resource_body, "family")
                .map(|f| f.to_uppercase())
                .unwrap_or_else(|| "C".to_string());
            let capacity = capture_int(resource_body, "capacity").unwrap_or(0);
            let sku = capture_str(resource_body, "sku_name").unwrap_or_else(|| "Basic".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-redis-{location}"),
                "azure_redis_cache",
                resource_name,
                location,
                format!("{sku}_{family}{capacity}"),
                count,
            ))
        }

        "azurerm_cosmosdb_account" => {
            let consistency = capture_str(resource_body, "consistency_level")
                .unwrap_or_else(|| "Session".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-cosmos-{location}"),
                "azure_cosmosdb_account",
                resource_name,
                location,
                consistency,
                count,
            ))
        }

        "azurerm_container_group" => {
            let cpu = capture_str(resource_body, "cpu")
                .and_then(|c| c.parse::<f64>().ok())
                .or_else(|| capture_int(resource_body, "cpu").map(|c| c as f64))
                .unwrap_or(1.0);
            let memory = capture_str(resource_body, "memory")
                .and_then(|m| m.parse::<f64>().ok())
                .or_else(|| capture_int(resource_body, "memory").map(|m| m as f64))
                .unwrap_or(1.5);
            let mut metadata = HashMap::new();
            metadata.insert("cpu".to_string(), serde_json::json!(cpu));
            metadata.insert("memory".to_string(), serde_json::json!(memory));
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-aci-{location}"),
                    "azure_container_instances",
                    resource_name,
                    location,
                    format!("{cpu}cpu-{memory}gb"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_application_gateway" => {
            let sku = capture_nested_str(resource_body, "sku", "name")
                .unwrap_or_else(|| "Standard_v2".to_string());
            let capacity = capture_nested_int(resource_body, "sku", "capacity").unwrap_or(2);
            let mut metadata = HashMap::new();
            metadata.insert("capacity".to_string(), capacity.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-appgw-{location}"),
                    "azure_application_gateway",
                    resource_name,
                    location,
                    format!("{sku}-{capacity}"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_postgresql_server" | "azurerm_postgresql_flexible_server" => {
            let sku = capture_str(resource_body, "sku_name").unwrap_or_else(|| "B_Gen5_2".to_string());
            let storage_gb = capture_int(resource_body, "storage_mb")
                .map(|mb| mb / 1024)
                .unwrap_or(5);
            let mut metadata = HashMap::new();
            metadata.insert("storage_gb".to_string(), storage_gb.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-postgresql-{location}"),
                    "azure_postgresql_server",
                    resource_name,
                    location,
                    format!("{sku}-{storage_gb}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_mysql_server" | "azurerm_mysql_flexible_server" => {
            let sku = capture_str(resource_body, "sku_name").unwrap_or_else(|| "B_Gen5_2".to_string());
            let storage_gb = capture_int(resource_body, "storage_mb")
                .map(|mb| mb / 1024)
                .unwrap_or(5);
            let mut metadata = HashMap::new();
            metadata.insert("storage_gb".to_string(), storage_gb.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-mysql-{location}"),
                    "azure_mysql_server",
                    resource_name,
                    location,
                    format!("{sku}-{storage_gb}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_sql_managed_instance" => {
            let sku = capture_str(resource_body, "sku_name").unwrap_or_else(|| "GP_Gen5".to_string());
            let vcores = capture_int(resource_body, "vcores").unwrap_or(4);
            let storage = capture_int(resource_body, "storage_size_in_gb").unwrap_or(32);
            let mut metadata = HashMap::new();
            metadata.insert("vcores".to_string(), vcores.into());
            metadata.insert("storage_gb".to_string(), storage.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-sqlmi-{location}"),
                    "azure_sql_managed_instance",
                    resource_name,
                    location,
                    format!("{sku}-{vcores}vCore-{storage}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "azurerm_data_factory" => Some(CanonicalResource::new(
            format!("{resource_name}-adf-{location}"),
            "azure_data_factory",
            resource_name,
            location,
            "standard",
            count,
        )),

        "azurerm_virtual_network_gateway" => {
            let sku = capture_str(resource_body, "sku").unwrap_or_else(|| "Basic".to_string());
            let gw_type = capture_str(resource_body, "type").unwrap_or_else(|| "Vpn".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-vnetgw-{location}"),
                "azure_virtual_network_gateway",
                resource_name,
                location,
                format!("{gw_type}_{sku}"),
                count,
            ))
        }

        "azurerm_synapse_workspace" => Some(CanonicalResource::new(
            format!("{resource_name}-synapse-{location}"),
            "azure_synapse_workspace",
            resource_name,
            location,
            "workspace",
            count,
        )),

        "azurerm_eventhub_namespace" => {
            let sku = capture_str(resource_body, "sku").unwrap_or_else(|| "Basic".to_string());
            let capacity = capture_int(resource_body, "capacity").unwrap_or(1);
            let mut metadata = HashMap::new();
            metadata.insert("capacity".to_string(), capacity.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-eventhub-{location}"),
                    "azure_eventhub_namespace",
                    resource_name,
                    location,
                    format!("{sku}-{capacity}"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_id_includes_size() {
        let body = r#"vm_size = "Standard_D2s_v3""#;
        let resource =
            parse_azure_resource("azurerm_linux_virtual_machine", "app", body, "eastus", 1).unwrap();
        assert_eq!(resource.id, "app-Standard_D2s_v3-eastus");
        assert_eq!(resource.resource_type, "azure_virtual_machine");
    }

    #[test]
    fn test_location_override() {
        let body = r#"location = "westeurope"
vm_size = "Standard_B2s""#;
        let resource =
            parse_azure_resource("azurerm_virtual_machine", "app", body, "eastus", 1).unwrap();
        assert_eq!(resource.region, "westeurope");
    }

    #[test]
    fn test_aks_nested_node_pool() {
        let body = r#"
default_node_pool {
  name       = "default"
  vm_size    = "Standard_D4s_v3"
  node_count = 5
}
"#;
        let resource =
            parse_azure_resource("azurerm_kubernetes_cluster", "k8s", body, "eastus", 1).unwrap();
        assert_eq!(resource.size, "Standard_D4s_v3-5nodes");
        assert_eq!(resource.metadata_i64("node_count"), Some(5));
    }

    #[test]
    fn test_app_service_plan_sku_name_wins() {
        let resource = parse_azure_resource(
            "azurerm_service_plan",
            "plan",
            r#"sku_name = "P1V2""#,
            "eastus",
            1,
        )
        .unwrap();
        assert_eq!(resource.size, "P1V2");
    }

    #[test]
    fn test_app_service_plan_tier_size_composition() {
        let body = r#"
sku {
  tier = "Standard"
  size = "S1"
}
"#;
        let resource =
            parse_azure_resource("azurerm_app_service_plan", "plan", body, "eastus", 1).unwrap();
        assert_eq!(resource.size, "Standard_S1");
    }

    #[test]
    fn test_redis_size_composition() {
        let body = r#"
sku_name = "Standard"
family   = "C"
capacity = 2
"#;
        let resource = parse_azure_resource("azurerm_redis_cache", "cache", body, "eastus", 1).unwrap();
        assert_eq!(resource.size, "Standard_C2");
    }

    #[test]
    fn test_postgres_storage_mb_to_gb() {
        let body = r#"
sku_name   = "GP_Gen5_4"
storage_mb = 10240
"#;
        let resource =
            parse_azure_resource("azurerm_postgresql_server", "db", body, "eastus", 1).unwrap();
        assert_eq!(resource.size, "GP_Gen5_4-10GB");
    }

    #[test]
    fn test_storage_account_tier_replication() {
        let body = r#"
account_tier             = "Premium"
account_replication_type = "ZRS"
"#;
        let resource =
            parse_azure_resource("azurerm_storage_account", "blobs", body, "eastus", 1).unwrap();
        assert_eq!(resource.size, "Premium_ZRS");
    }

    #[test]
    fn test_unsupported_kind_returns_none() {
        assert!(parse_azure_resource("azurerm_resource_group", "rg", "", "eastus", 1).is_none());
    }
}
