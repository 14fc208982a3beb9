//! Cost simulation: canonical resource model in, pre-policy check response
//! out. Strictly in-memory; consults only the static catalogs.

use crate::domain::{
    round2, CanonicalResource, CanonicalResourceModel, CheckResponse, PriceQuote,
    PricingConfidence, ResourceBreakdownItem,
};
use crate::pricing::{aws, azure, gcp};

/// Hours in the billing month used throughout the catalogs.
const HOURS_PER_MONTH: f64 = 730.0;

/// Weeks per month divisor for the first-week figure.
const WEEKS_PER_MONTH: f64 = 4.345;

/// Tracks the weakest confidence among consulted quotes.
struct ConfidenceTracker {
    minimum: Option<PricingConfidence>,
}

impl ConfidenceTracker {
    fn new() -> Self {
        Self { minimum: None }
    }

    fn observe(&mut self, confidence: PricingConfidence) {
        self.minimum = Some(match self.minimum {
            Some(current) => current.min(confidence),
            None => confidence,
        });
    }

    /// High when no quote was consulted (empty model).
    fn resolve(self) -> PricingConfidence {
        self.minimum.unwrap_or(PricingConfidence::High)
    }
}

/// One costed line, before aggregation.
struct CostedLine {
    monthly: f64,
    notes: Vec<String>,
    quote_confidence: Option<PricingConfidence>,
}

impl CostedLine {
    fn from_quote(quote: &PriceQuote, count: i64) -> Self {
        Self {
            monthly: quote.monthly_price * count as f64,
            notes: Vec::new(),
            quote_confidence: Some(quote.confidence),
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Simulate monthly cost for a canonical resource model.
///
/// Resources with `count == 0` contribute nothing and never appear in the
/// breakdown. Unknown resource types are skipped entirely.
pub fn simulate_cost(model: &CanonicalResourceModel) -> CheckResponse {
    let mut breakdown: Vec<ResourceBreakdownItem> = Vec::new();
    let mut total_monthly = 0.0;
    let mut confidence = ConfidenceTracker::new();

    for resource in &model.resources {
        if resource.count <= 0 {
            continue;
        }
        let Some(line) = cost_resource(resource) else {
            continue;
        };

        if let Some(quote_confidence) = line.quote_confidence {
            confidence.observe(quote_confidence);
        }
        total_monthly += line.monthly;

        let mut item = ResourceBreakdownItem::new(&resource.id, line.monthly);
        item.notes = line.notes;
        breakdown.push(item);
    }

    let estimated_monthly_cost = round2(total_monthly);

    CheckResponse {
        estimated_monthly_cost,
        estimated_first_week_cost: round2(estimated_monthly_cost / WEEKS_PER_MONTH),
        breakdown_by_resource: breakdown,
        risk_flags: Vec::new(),
        recommendations: Vec::new(),
        policy_eval: None,
        pricing_confidence: confidence.resolve(),
        duration_ms: 1,
    }
}

fn cost_resource(resource: &CanonicalResource) -> Option<CostedLine> {
    let count = resource.count;
    let region = resource.region.as_str();
    let size = resource.size.as_str();

    match resource.resource_type.as_str() {
        // --- AWS ---
        "aws_instance" | "aws_autoscaling_group" => {
            let quote = aws::get_aws_ec2_ondemand_price(region, size);
            Some(CostedLine::from_quote(&quote, count))
        }

        // The Terraform handler registers `aws_load_balancer`, the Ansible
        // handler `aws_lb`; both take the application-LB flat rate.
        "aws_lb" | "aws_load_balancer" => {
            let quote = aws::get_aws_load_balancer_price();
            Some(CostedLine::from_quote(&quote, count))
        }

        "aws_eks_cluster" => {
            let quote = aws::get_aws_eks_price();
            Some(CostedLine::from_quote(&quote, count))
        }

        "aws_db_instance" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::Rds, region, size),
            count,
        )),
        "aws_redshift_cluster" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::Redshift, region, size),
            count,
        )),
        "aws_opensearch_domain" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::Opensearch, region, size),
            count,
        )),
        "aws_elasticache_cluster" | "aws_elasticache_replication_group" => {
            Some(CostedLine::from_quote(
                &aws::get_aws_service_price(aws::AwsService::Elasticache, region, size),
                count,
            ))
        }
        "aws_neptune_cluster" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::Neptune, region, size),
            count,
        )),
        "aws_docdb_cluster" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::DocumentDb, region, size),
            count,
        )),
        "aws_msk_cluster" => Some(CostedLine::from_quote(
            &aws::get_aws_service_price(aws::AwsService::Msk, region, size),
            count,
        )),

        "aws_dynamodb_table" => {
            if size == "PAY_PER_REQUEST" {
                return Some(CostedLine {
                    monthly: 0.0,
                    notes: vec!["ppr model not estimated".to_string()],
                    quote_confidence: None,
                });
            }
            let read = resource.metadata_i64("read_capacity").unwrap_or(0);
            let write = resource.metadata_i64("write_capacity").unwrap_or(0);
            let quote = aws::get_aws_dynamodb_provisioned_price(read, write);
            Some(CostedLine::from_quote(&quote, 1))
        }

        // --- GCP ---
        "gcp_compute_instance" => Some(CostedLine::from_quote(
            &gcp::get_gcp_instance_price(size, region),
            count,
        )),

        "gcp_sql_database_instance" => Some(CostedLine::from_quote(
            &gcp::get_gcp_database_price(size, region),
            count,
        )),

        "gcp_storage_bucket" => {
            let (per_gb, quote_confidence) = gcp::get_gcp_storage_price(size);
            let estimated_gb = 100.0;
            Some(CostedLine {
                monthly: per_gb * estimated_gb * count as f64,
                notes: vec![format!("Estimated {estimated_gb:.0}GB per bucket")],
                quote_confidence: Some(quote_confidence),
            })
        }

        "gcp_container_cluster" => {
            let quote = gcp::get_gcp_kubernetes_price(size);
            Some(
                CostedLine::from_quote(&quote, count)
                    .with_note("Cluster management cost only - node costs separate"),
            )
        }

        "gcp_cloud_run_service" => {
            // Assumed footprint: 2 vCPU + 4 GB, 720 hours per month.
            let cpu_hours = 2.0 * 720.0 * count as f64;
            let memory_gb_hours = 4.0 * 720.0 * count as f64;
            Some(CostedLine {
                monthly: cpu_hours * gcp::CLOUD_RUN_CPU_PER_HOUR
                    + memory_gb_hours * gcp::CLOUD_RUN_MEMORY_PER_GB_HOUR,
                notes: vec!["Estimated 2 vCPU, 4GB memory, 720 hours/month".to_string()],
                quote_confidence: Some(PricingConfidence::Medium),
            })
        }

        "gcp_cloudfunctions_function" => {
            let invocations = 1_000_000.0 * count as f64;
            let gb_seconds = 100.0 * count as f64;
            Some(CostedLine {
                monthly: invocations * gcp::CLOUD_FUNCTIONS_PER_MILLION_INVOCATIONS / 1_000_000.0
                    + gb_seconds * gcp::CLOUD_FUNCTIONS_PER_GB_SECOND,
                notes: vec!["Estimated 1M invocations, 100GB-seconds per month".to_string()],
                quote_confidence: Some(PricingConfidence::Medium),
            })
        }

        "gcp_load_balancer" => Some(CostedLine::from_quote(
            &gcp::get_gcp_load_balancer_price(size),
            count,
        )),

        "gcp_redis_instance" => {
            let memory_gb = gcp::get_gcp_redis_memory_gb(size);
            let hourly = gcp::REDIS_PER_GB_HOUR * memory_gb as f64;
            Some(CostedLine {
                monthly: hourly * HOURS_PER_MONTH * count as f64,
                notes: vec![format!("Estimated {memory_gb}GB memory")],
                quote_confidence: Some(PricingConfidence::Medium),
            })
        }

        "gcp_spanner_instance" => {
            let nodes = gcp::get_gcp_spanner_node_count(size);
            Some(CostedLine {
                monthly: nodes * gcp::SPANNER_NODE_HOURLY * HOURS_PER_MONTH * count as f64,
                notes: Vec::new(),
                quote_confidence: Some(PricingConfidence::Medium),
            })
        }

        "gcp_bigquery_dataset" => Some(CostedLine {
            monthly: gcp::BIGQUERY_DATASET_MONTHLY * count as f64,
            notes: vec!["Estimated $10/month per dataset (pay-per-use)".to_string()],
            quote_confidence: Some(PricingConfidence::Low),
        }),

        // --- Azure ---
        "azure_virtual_machine" => Some(CostedLine::from_quote(
            &azure::get_azure_vm_price(size, region),
            count,
        )),

        "azure_sql_database" => Some(CostedLine::from_quote(
            &azure::get_azure_sql_price(size, region),
            count,
        )),

        "azure_postgresql_server" | "azure_mysql_server" => Some(CostedLine::from_quote(
            &azure::get_azure_flexible_server_price(size),
            count,
        )),

        "azure_sql_managed_instance" => {
            let vcores = resource.metadata_i64("vcores").unwrap_or(4);
            Some(CostedLine::from_quote(
                &azure::get_azure_sqlmi_price(vcores),
                count,
            ))
        }

        "azure_app_service_plan" => Some(CostedLine::from_quote(
            &azure::get_azure_app_service_price(size),
            count,
        )),

        "azure_storage_account" => {
            let (per_gb, quote_confidence) = azure::get_azure_storage_price(size);
            let estimated_gb = 100.0;
            Some(CostedLine {
                monthly: per_gb * estimated_gb * count as f64,
                notes: vec![format!("Estimated {estimated_gb:.0}GB per account")],
                quote_confidence: Some(quote_confidence),
            })
        }

        "azure_kubernetes_cluster" => Some(CostedLine {
            monthly: 0.0,
            notes: vec!["Control plane free - node costs separate".to_string()],
            quote_confidence: Some(PricingConfidence::High),
        }),

        "azure_function_app" => {
            let executions = 1_000_000.0 * count as f64;
            let gb_seconds = 100.0 * count as f64;
            Some(CostedLine {
                monthly: executions * azure::FUNCTIONS_PER_MILLION_EXECUTIONS / 1_000_000.0
                    + gb_seconds * azure::FUNCTIONS_PER_GB_SECOND,
                notes: vec!["Estimated 1M executions, 100GB-seconds per month".to_string()],
                quote_confidence: Some(PricingConfidence::Medium),
            })
        }

        "azure_load_balancer" => Some(CostedLine::from_quote(
            &azure::get_azure_load_balancer_price(size),
            count,
        )),

        "azure_redis_cache" => Some(CostedLine::from_quote(
            &azure::get_azure_redis_price(size),
            count,
        )),

        "azure_cosmosdb_account" => {
            let quote = azure::get_azure_cosmos_price(400, 10.0);
            Some(
                CostedLine::from_quote(&quote, count)
                    .with_note("Estimated 400 RU/s provisioned, 10GB storage"),
            )
        }

        _ => None,
    }
}
