//! Azure Ansible module handlers.

use std::collections::HashMap;

use crate::domain::CanonicalResource;

use super::{param_i64, param_str};

/// Parse one Azure Ansible task into canonical form.
pub fn parse_azure_ansible_task(
    module_name: &str,
    params: &serde_yaml::Mapping,
    task_name: &str,
    default_location: &str,
) -> Option<CanonicalResource> {
    let location = param_str(params, "location", default_location);

    match module_name {
        "azure_rm_virtualmachine" => {
            let vm_size = param_str(params, "vm_size", "Standard_B1s");
            Some(CanonicalResource::new(
                format!("{task_name}-{vm_size}-{location}"),
                "azure_virtual_machine",
                task_name,
                location,
                vm_size,
                1,
            ))
        }

        "azure_rm_virtualmachinescaleset" => {
            let vm_size = param_str(params, "vm_size", "Standard_B1s");
            let capacity = param_i64(params, "capacity", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-vmss-{vm_size}-{location}"),
                "azure_virtual_machine",
                task_name,
                location,
                vm_size,
                capacity,
            ))
        }

        "azure_rm_containerinstance" => {
            let mut metadata = HashMap::new();
            metadata.insert("cpu".to_string(), param_i64(params, "cpu", 1).into());
            metadata.insert("memory".to_string(), param_i64(params, "memory", 1).into());
            Some(
                CanonicalResource::new(
                    format!("{task_name}-aci-{location}"),
                    "azure_container_instances",
                    task_name,
                    location,
                    "container",
                    1,
                )
                .with_metadata(metadata),
            )
        }

        "azure_rm_aks" => {
            let node_count = param_i64(params, "node_count", 3);
            let vm_size = param_str(params, "vm_size", "Standard_DS2_v2");
            let mut metadata = HashMap::new();
            metadata.insert("node_count".to_string(), node_count.into());
            Some(
                CanonicalResource::new(
                    format!("{task_name}-aks-{location}"),
                    "azure_kubernetes_cluster",
                    task_name,
                    location,
                    format!("{vm_size}-{node_count}nodes"),
                    1,
                )
                .with_metadata(metadata),
            )
        }

        "azure_rm_appserviceplan" => {
            let sku = param_str(params, "sku", "B1");
            Some(CanonicalResource::new(
                format!("{task_name}-appplan-{location}"),
                "azure_app_service_plan",
                task_name,
                location,
                sku,
                1,
            ))
        }

        "azure_rm_webapp" => Some(CanonicalResource::new(
            format!("{task_name}-webapp-{location}"),
            "azure_web_app",
            task_name,
            location,
            "webapp",
            1,
        )),

        "azure_rm_functionapp" => Some(CanonicalResource::new(
            format!("{task_name}-function-{location}"),
            "azure_function_app",
            task_name,
            location,
            "function",
            1,
        )),

        "azure_rm_sqlserver" => Some(CanonicalResource::new(
            format!("{task_name}-sql-server-{location}"),
            "azure_sql_server",
            task_name,
            location,
            "server",
            1,
        )),

        "azure_rm_sqldatabase" => {
            let sku = param_str(params, "sku", "S0");
            Some(CanonicalResource::new(
                format!("{task_name}-sqldb-{location}"),
                "azure_sql_database",
                task_name,
                location,
                sku,
                1,
            ))
        }

        "azure_rm_storageaccount" => {
            let account_type = param_str(params, "account_type", "Standard_LRS");
            Some(CanonicalResource::new(
                format!("{task_name}-storage-{location}"),
                "azure_storage_account",
                task_name,
                location,
                account_type,
                1,
            ))
        }

        "azure_rm_loadbalancer" => {
            let sku = param_str(params, "sku", "Basic");
            Some(CanonicalResource::new(
                format!("{task_name}-lb-{location}"),
                "azure_load_balancer",
                task_name,
                location,
                sku,
                1,
            ))
        }

        "azure_rm_rediscache" => {
            let sku = param_str(params, "sku", "Basic");
            let size = param_str(params, "size", "C0");
            Some(CanonicalResource::new(
                format!("{task_name}-redis-{location}"),
                "azure_redis_cache",
                task_name,
                location,
                format!("{sku}_{size}"),
                1,
            ))
        }

        "azure_rm_cosmosdbaccount" => {
            let consistency = param_str(params, "consistency_level", "Session");
            Some(CanonicalResource::new(
                format!("{task_name}-cosmos-{location}"),
                "azure_cosmosdb_account",
                task_name,
                location,
                consistency,
                1,
            ))
        }

        "azure_rm_eventhub" => {
            let sku = param_str(params, "sku", "Basic");
            Some(CanonicalResource::new(
                format!("{task_name}-eventhub-{location}"),
                "azure_eventhub_namespace",
                task_name,
                location,
                sku,
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
    fn test_vm_defaults() {
        let resource =
            parse_azure_ansible_task("azure_rm_virtualmachine", &params("{}"), "vm", "eastus")
                .unwrap();
        assert_eq!(resource.resource_type, "azure_virtual_machine");
        assert_eq!(resource.size, "Standard_B1s");
    }

    #[test]
    fn test_scale_set_capacity_becomes_count() {
        let body = r#"
vm_size: Standard_D2s_v3
capacity: 5
"#;
        let resource = parse_azure_ansible_task(
            "azure_rm_virtualmachinescaleset",
            &params(body),
            "pool",
            "eastus",
        )
        .unwrap();
        assert_eq!(resource.count, 5);
    }

    #[test]
    fn test_redis_sku_composition() {
        let body = r#"
sku: Standard
size: C2
"#;
        let resource =
            parse_azure_ansible_task("azure_rm_rediscache", &params(body), "cache", "eastus").unwrap();
        assert_eq!(resource.size, "Standard_C2");
    }

    #[test]
    fn test_location_override() {
        let body = "location: westeurope";
        let resource =
            parse_azure_ansible_task("azure_rm_webapp", &params(body), "site", "eastus").unwrap();
        assert_eq!(resource.region, "westeurope");
    }

    #[test]
    fn test_unknown_module_returns_none() {
        assert!(parse_azure_ansible_task("azure_rm_dnszone", &params("{}"), "z", "eastus").is_none());
    }
}
