//! AWS Ansible module handlers.

use std::collections::HashMap;

use crate::domain::CanonicalResource;

use super::{nested_str, param_i64, param_str, yaml_get};

/// Parse one AWS Ansible task into canonical form.
pub fn parse_aws_ansible_task(
    module_name: &str,
    params: &serde_yaml::Mapping,
    task_name: &str,
    default_region: &str,
) -> Option<CanonicalResource> {
    let region = param_str(params, "region", default_region);

    match module_name {
        "ec2_instance" => {
            let instance_type = param_str(params, "instance_type", "t3.micro");
            Some(CanonicalResource::new(
                format!("{task_name}-{instance_type}-{region}"),
                "aws_instance",
                task_name,
                region,
                instance_type,
                1,
            ))
        }

        "ec2_asg" => {
            let instance_type = nested_str(params, "launch_template", "instance_type", "t3.micro");
            let desired = param_i64(params, "desired_capacity", 1);
            let mut metadata = HashMap::new();
            metadata.insert("min_size".to_string(), param_i64(params, "min_size", 1).into());
            metadata.insert("max_size".to_string(), param_i64(params, "max_size", 10).into());
            metadata.insert("desired_capacity".to_string(), desired.into());
            Some(
                CanonicalResource::new(
                    format!("{task_name}-asg-{instance_type}-{region}"),
                    "aws_autoscaling_group",
                    task_name,
                    region,
                    instance_type,
                    desired,
                )
                .with_metadata(metadata),
            )
        }

        "eks_cluster" => Some(CanonicalResource::new(
            format!("{task_name}-eks-{region}"),
            "aws_eks_cluster",
            task_name,
            region,
            "standard",
            1,
        )),

        "lambda_function" => {
            let memory = param_i64(params, "memory_size", 128);
            let runtime = param_str(params, "runtime", "python3.9");
            let mut metadata = HashMap::new();
            metadata.insert("memory_mb".to_string(), memory.into());
            metadata.insert("runtime".to_string(), runtime.clone().into());
            Some(
                CanonicalResource::new(
                    format!("{task_name}-lambda-{memory}MB-{runtime}-{region}"),
                    "aws_lambda_function",
                    task_name,
                    region,
                    format!("{memory}MB-{runtime}"),
                    1,
                )
                .with_metadata(metadata),
            )
        }

        "ecs_cluster" => Some(CanonicalResource::new(
            format!("{task_name}-ecs-{region}"),
            "aws_ecs_cluster",
            task_name,
            region,
            "standard",
            1,
        )),

        "ecs_service" => {
            let desired = param_i64(params, "desired_count", 1);
            let mut metadata = HashMap::new();
            metadata.insert(
                "launch_type".to_string(),
                param_str(params, "launch_type", "EC2").into(),
            );
            Some(
                CanonicalResource::new(
                    format!("{task_name}-ecs-service-{region}"),
                    "aws_ecs_service",
                    task_name,
                    region,
                    "standard",
                    desired,
                )
                .with_metadata(metadata),
            )
        }

        "rds_instance" | "rds" => {
            let instance_class = param_str(params, "instance_class", "db.t3.micro");
            Some(CanonicalResource::new(
                format!("{task_name}-rds-{instance_class}-{region}"),
                "aws_db_instance",
                task_name,
                region,
                instance_class,
                1,
            ))
        }

        "dynamodb_table" => {
            let billing = param_str(params, "billing_mode", "PAY_PER_REQUEST");
            let mut metadata = HashMap::new();
            metadata.insert("billing_mode".to_string(), billing.clone().into());
            metadata.insert(
                "read_capacity".to_string(),
                yaml_get(params, "read_capacity")
                    .and_then(|v| v.as_i64())
                    .map(Into::into)
                    .unwrap_or(serde_json::Value::Null),
            );
            metadata.insert(
                "write_capacity".to_string(),
                yaml_get(params, "write_capacity")
                    .and_then(|v| v.as_i64())
                    .map(Into::into)
                    .unwrap_or(serde_json::Value::Null),
            );
            Some(
                CanonicalResource::new(
                    format!("{task_name}-dynamodb-{region}"),
                    "aws_dynamodb_table",
                    task_name,
                    region,
                    billing,
                    1,
                )
                .with_metadata(metadata),
            )
        }

        "s3_bucket" | "aws_s3" => Some(CanonicalResource::new(
            format!("{task_name}-s3-{region}"),
            "aws_s3_bucket",
            task_name,
            region,
            "STANDARD",
            1,
        )),

        // Registers type `aws_lb`, unlike the Terraform handler's
        // `aws_load_balancer`. Both are priced identically downstream.
        "elb_application_lb" => {
            let lb_type = param_str(params, "load_balancer_type", "application");
            Some(CanonicalResource::new(
                format!("{task_name}-alb-{region}"),
                "aws_lb",
                task_name,
                region,
                lb_type,
                1,
            ))
        }

        "sns_topic" => Some(CanonicalResource::new(
            format!("{task_name}-sns-{region}"),
            "aws_sns_topic",
            task_name,
            region,
            "standard",
            1,
        )),

        "sqs_queue" => Some(CanonicalResource::new(
            format!("{task_name}-sqs-{region}"),
            "aws_sqs_queue",
            task_name,
            region,
            "standard",
            1,
        )),

        "api_gateway" => Some(CanonicalResource::new(
            format!("{task_name}-apigw-{region}"),
            "aws_api_gateway",
            task_name,
            region,
            "standard",
            1,
        )),

        "cloudfront_distribution" => Some(CanonicalResource::new(
            format!("{task_name}-cloudfront-{region}"),
            "aws_cloudfront_distribution",
            task_name,
            region,
            "standard",
            1,
        )),

        "elasticache_cluster" => {
            let node_type = param_str(params, "node_type", "cache.t3.micro");
            let num_nodes = param_i64(params, "num_cache_nodes", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-elasticache-{node_type}-{region}"),
                "aws_elasticache_cluster",
                task_name,
                region,
                node_type,
                num_nodes,
            ))
        }

        "kinesis_stream" => {
            let shards = param_i64(params, "shard_count", 1);
            Some(CanonicalResource::new(
                format!("{task_name}-kinesis-{shards}shards-{region}"),
                "aws_kinesis_stream",
                task_name,
                region,
                format!("{shards}-shards"),
                1,
            ))
        }

        "stepfunctions_state_machine" => Some(CanonicalResource::new(
            format!("{task_name}-sfn-{region}"),
            "aws_sfn_state_machine",
            task_name,
            region,
            "standard",
            1,
        )),

        _ => None,
    }
}
