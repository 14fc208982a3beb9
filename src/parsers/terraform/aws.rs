//! AWS Terraform resource handlers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::CanonicalResource;

use super::{capture_int, capture_str};

static PROVIDER_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)provider\s+"aws"\s*\{[^}]*region\s*=\s*"([a-z0-9-]+)""#).expect("valid regex")
});

/// Default AWS region from the provider block, else `us-east-1`.
pub fn get_aws_default_region(hcl_text: &str) -> String {
    PROVIDER_REGION
        .captures(hcl_text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "us-east-1".to_string())
}

/// Parse one AWS resource block into canonical form. Returns `None` for
/// kinds outside the priced universe.
pub fn parse_aws_resource(
    resource_type: &str,
    resource_name: &str,
    resource_body: &str,
    default_region: &str,
    count: i64,
) -> Option<CanonicalResource> {
    let region = capture_str(resource_body, "region").unwrap_or_else(|| default_region.to_string());

    match resource_type {
        "aws_instance" => {
            let instance_type =
                capture_str(resource_body, "instance_type").unwrap_or_else(|| "t3.micro".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-{instance_type}-{region}"),
                "aws_instance",
                resource_name,
                region,
                instance_type,
                count,
            ))
        }

        "aws_lb" | "aws_alb" | "aws_lb_listener" => Some(CanonicalResource::new(
            format!("{resource_name}-lb-{region}"),
            "aws_load_balancer",
            resource_name,
            region,
            "application",
            count,
        )),

        "aws_autoscaling_group" => {
            let capacity = capture_int(resource_body, "desired_capacity").unwrap_or(1);
            let instance_type =
                capture_str(resource_body, "instance_type").unwrap_or_else(|| "t3.micro".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-asg-{region}"),
                "aws_autoscaling_group",
                resource_name,
                region,
                instance_type,
                capacity,
            ))
        }

        "aws_eks_cluster" => Some(CanonicalResource::new(
            format!("{resource_name}-eks-{region}"),
            "aws_eks_cluster",
            resource_name,
            region,
            "cluster",
            count,
        )),

        "aws_db_instance" => {
            let instance_class =
                capture_str(resource_body, "instance_class").unwrap_or_else(|| "db.t3.micro".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-rds-{region}"),
                "aws_db_instance",
                resource_name,
                region,
                instance_class,
                count,
            ))
        }

        "aws_redshift_cluster" => {
            let node_type =
                capture_str(resource_body, "node_type").unwrap_or_else(|| "dc2.large".to_string());
            let num_nodes = capture_int(resource_body, "number_of_nodes").unwrap_or(1);
            Some(CanonicalResource::new(
                format!("{resource_name}-redshift-{region}"),
                "aws_redshift_cluster",
                resource_name,
                region,
                node_type,
                num_nodes,
            ))
        }

        "aws_opensearch_domain" => {
            let instance_type = capture_str(resource_body, "instance_type")
                .unwrap_or_else(|| "t3.small.search".to_string());
            let instance_count = capture_int(resource_body, "instance_count").unwrap_or(1);
            Some(CanonicalResource::new(
                format!("{resource_name}-opensearch-{region}"),
                "aws_opensearch_domain",
                resource_name,
                region,
                instance_type,
                instance_count,
            ))
        }

        "aws_elasticache_cluster" => {
            let node_type =
                capture_str(resource_body, "node_type").unwrap_or_else(|| "cache.t3.micro".to_string());
            let num_nodes = capture_int(resource_body, "num_cache_nodes").unwrap_or(1);
            Some(CanonicalResource::new(
                format!("{resource_name}-elasticache-{region}"),
                "aws_elasticache_cluster",
                resource_name,
                region,
                node_type,
                num_nodes,
            ))
        }

        "aws_elasticache_replication_group" => {
            let node_type =
                capture_str(resource_body, "node_type").unwrap_or_else(|| "cache.t3.micro".to_string());
            let num_clusters = capture_int(resource_body, "number_cache_clusters").unwrap_or(2);
            Some(CanonicalResource::new(
                format!("{resource_name}-elasticache-rg-{region}"),
                "aws_elasticache_replication_group",
                resource_name,
                region,
                node_type,
                num_clusters,
            ))
        }

        "aws_dynamodb_table" => {
            let billing = capture_str(resource_body, "billing_mode")
                .map(|b| b.to_uppercase())
                .unwrap_or_else(|| "PAY_PER_REQUEST".to_string());
            let mut metadata = HashMap::new();
            metadata.insert(
                "read_capacity".to_string(),
                capture_int(resource_body, "read_capacity")
                    .map(Into::into)
                    .unwrap_or(serde_json::Value::Null),
            );
            metadata.insert(
                "write_capacity".to_string(),
                capture_int(resource_body, "write_capacity")
                    .map(Into::into)
                    .unwrap_or(serde_json::Value::Null),
            );
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-dynamodb-{region}"),
                    "aws_dynamodb_table",
                    resource_name,
                    region,
                    billing,
                    1,
                )
                .with_metadata(metadata),
            )
        }

        "aws_lambda_function" => {
            let memory = capture_int(resource_body, "memory_size").unwrap_or(128);
            let runtime =
                capture_str(resource_body, "runtime").unwrap_or_else(|| "python3.9".to_string());
            let mut metadata = HashMap::new();
            metadata.insert("memory_mb".to_string(), memory.into());
            metadata.insert("runtime".to_string(), runtime.clone().into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-lambda-{region}"),
                    "aws_lambda_function",
                    resource_name,
                    region,
                    format!("{memory}MB-{runtime}"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "aws_s3_bucket" => {
            let storage_class = capture_str(resource_body, "storage_class")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| "STANDARD".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-s3-{region}"),
                "aws_s3_bucket",
                resource_name,
                region,
                storage_class,
                count,
            ))
        }

        "aws_ecs_cluster" => Some(CanonicalResource::new(
            format!("{resource_name}-ecs-{region}"),
            "aws_ecs_cluster",
            resource_name,
            region,
            "cluster",
            count,
        )),

        "aws_ecs_service" => {
            let desired = capture_int(resource_body, "desired_count").unwrap_or(1);
            let launch_type = capture_str(resource_body, "launch_type")
                .map(|l| l.to_uppercase())
                .unwrap_or_else(|| "EC2".to_string());
            let mut metadata = HashMap::new();
            metadata.insert("desired_count".to_string(), desired.into());
            metadata.insert("launch_type".to_string(), launch_type.clone().into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-ecs-service-{region}"),
                    "aws_ecs_service",
                    resource_name,
                    region,
                    format!("{launch_type}-{desired}tasks"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "aws_ecs_task_definition" => {
            let cpu = capture_int(resource_body, "cpu").unwrap_or(256);
            let memory = capture_int(resource_body, "memory").unwrap_or(512);
            let mut metadata = HashMap::new();
            metadata.insert("cpu".to_string(), cpu.into());
            metadata.insert("memory".to_string(), memory.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-fargate-{region}"),
                    "aws_ecs_task_definition",
                    resource_name,
                    region,
                    format!("{cpu}cpu-{memory}mb"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "aws_kinesis_stream" => {
            let shards = capture_int(resource_body, "shard_count").unwrap_or(1);
            let mut metadata = HashMap::new();
            metadata.insert("shard_count".to_string(), shards.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-kinesis-{region}"),
                    "aws_kinesis_stream",
                    resource_name,
                    region,
                    format!("{shards}shards"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        "aws_sns_topic" => Some(CanonicalResource::new(
            format!("{resource_name}-sns-{region}"),
            "aws_sns_topic",
            resource_name,
            region,
            "topic",
            count,
        )),

        "aws_sqs_queue" => {
            let fifo = Regex::new(r"(?i)fifo_queue\s*=\s*true")
                .ok()
                .map(|re| re.is_match(resource_body))
                .unwrap_or(false);
            Some(CanonicalResource::new(
                format!("{resource_name}-sqs-{region}"),
                "aws_sqs_queue",
                resource_name,
                region,
                if fifo { "fifo" } else { "standard" },
                count,
            ))
        }

        "aws_sfn_state_machine" => {
            let sfn_type = capture_str(resource_body, "type")
                .map(|t| t.to_uppercase())
                .unwrap_or_else(|| "STANDARD".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-stepfunctions-{region}"),
                "aws_sfn_state_machine",
                resource_name,
                region,
                sfn_type,
                count,
            ))
        }

        "aws_api_gateway_rest_api" | "aws_apigatewayv2_api" => {
            let protocol = capture_str(resource_body, "protocol_type")
                .map(|p| p.to_uppercase())
                .unwrap_or_else(|| "HTTP".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-apigateway-{region}"),
                "aws_api_gateway",
                resource_name,
                region,
                protocol,
                count,
            ))
        }

        "aws_cloudfront_distribution" => {
            let price_class = capture_str(resource_body, "price_class")
                .unwrap_or_else(|| "PriceClass_All".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-cloudfront-global"),
                "aws_cloudfront_distribution",
                resource_name,
                "global",
                price_class,
                count,
            ))
        }

        "aws_neptune_cluster" => {
            let instance_class = capture_str(resource_body, "instance_class")
                .unwrap_or_else(|| "db.t3.medium".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-neptune-{region}"),
                "aws_neptune_cluster",
                resource_name,
                region,
                instance_class,
                count,
            ))
        }

        "aws_docdb_cluster" => {
            let instance_class = capture_str(resource_body, "instance_class")
                .unwrap_or_else(|| "db.t3.medium".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-documentdb-{region}"),
                "aws_docdb_cluster",
                resource_name,
                region,
                instance_class,
                count,
            ))
        }

        "aws_msk_cluster" => {
            let instance_type = capture_str(resource_body, "instance_type")
                .unwrap_or_else(|| "kafka.t3.small".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-msk-{region}"),
                "aws_msk_cluster",
                resource_name,
                region,
                instance_type,
                count,
            ))
        }

        "aws_emr_cluster" => {
            let master_type = capture_str(resource_body, "master_instance_type")
                .unwrap_or_else(|| "m5.xlarge".to_string());
            Some(CanonicalResource::new(
                format!("{resource_name}-emr-{region}"),
                "aws_emr_cluster",
                resource_name,
                region,
                master_type,
                count,
            ))
        }

        "aws_glue_crawler" | "aws_glue_job" => Some(CanonicalResource::new(
            format!("{resource_name}-glue-{region}"),
            "aws_glue",
            resource_name,
            region,
            "job",
            count,
        )),

        "aws_athena_workgroup" => Some(CanonicalResource::new(
            format!("{resource_name}-athena-{region}"),
            "aws_athena_workgroup",
            resource_name,
            region,
            "workgroup",
            count,
        )),

        "aws_apprunner_service" => {
            let cpu = capture_int(resource_body, "cpu").unwrap_or(1);
            let memory = capture_int(resource_body, "memory").unwrap_or(2);
            let mut metadata = HashMap::new();
            metadata.insert("cpu".to_string(), cpu.into());
            metadata.insert("memory".to_string(), memory.into());
            Some(
                CanonicalResource::new(
                    format!("{resource_name}-apprunner-{region}"),
                    "aws_apprunner_service",
                    resource_name,
                    region,
                    format!("{cpu}vCPU-{memory}GB"),
                    count,
                )
                .with_metadata(metadata),
            )
        }

        _ => None,
    }
}
