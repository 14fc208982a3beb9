//! Integration tests for the analysis pipeline: parse → simulate →
//! evaluate → orchestrate.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use finopsguard::audit::AuditLogger;
use finopsguard::cache::{AnalysisCache, CacheClient};
use finopsguard::domain::policy::OverallStatus;
use finopsguard::domain::{round2, CheckRequest, Environment, IacType, PolicyEvalStatus};
use finopsguard::engine::PolicyEngine;
use finopsguard::storage::{AnalysisStore, PolicyStore, WebhookStore};
use finopsguard::webhooks::WebhookEventService;
use finopsguard::{parse_terraform_to_crmodel, simulate_cost, AnalysisOrchestrator, Policy};

fn encode(payload: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(payload)
}

async fn orchestrator() -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        PolicyEngine::new(Arc::new(PolicyStore::in_memory().await)),
        Arc::new(AnalysisStore::in_memory()),
        AnalysisCache::new(CacheClient::disabled()),
        Arc::new(WebhookEventService::new(Arc::new(WebhookStore::in_memory().await))),
        Arc::new(AuditLogger::for_tests()),
    )
}

fn check_request(hcl: &str, environment: Environment, budget: Option<f64>) -> CheckRequest {
    CheckRequest {
        iac_type: IacType::Terraform,
        iac_payload: encode(hcl),
        environment,
        budget_rules: budget.map(|b| HashMap::from([("monthly_budget".to_string(), b)])),
        options: None,
    }
}

#[test]
fn first_week_invariant_holds_across_models() {
    let documents = [
        r#"resource "aws_instance" "a" { instance_type = "t3.medium" }"#,
        r#"resource "aws_instance" "a" { count = 7 instance_type = "m5.large" }"#,
        r#"resource "google_compute_instance" "g" { machine_type = "c2-standard-8" }"#,
        r#"resource "azurerm_linux_virtual_machine" "z" { vm_size = "Standard_E4s_v3" }"#,
    ];
    for hcl in documents {
        let response = simulate_cost(&parse_terraform_to_crmodel(hcl));
        assert_eq!(
            response.estimated_first_week_cost,
            round2(response.estimated_monthly_cost / 4.345),
            "first-week invariant failed for {hcl}"
        );
        let sum: f64 = response
            .breakdown_by_resource
            .iter()
            .map(|item| item.monthly_cost)
            .sum();
        assert_eq!(response.estimated_monthly_cost, round2(sum));
    }
}

#[test]
fn breakdown_items_match_positive_count_resources() {
    let hcl = r#"
resource "aws_instance" "deployed" { instance_type = "t3.micro" }
resource "aws_instance" "dormant" {
  count         = 0
  instance_type = "t3.micro"
}
"#;
    let model = parse_terraform_to_crmodel(hcl);
    let response = simulate_cost(&model);
    assert_eq!(response.breakdown_by_resource.len(), 1);
    for item in &response.breakdown_by_resource {
        let matching = model
            .resources
            .iter()
            .filter(|resource| resource.id == item.resource_id && resource.count > 0)
            .count();
        assert_eq!(matching, 1);
    }
}

#[tokio::test]
async fn scenario_baseline_ec2() {
    let hcl = r#"
resource "aws_instance" "x" {
  instance_type = "t3.medium"
}

provider "aws" {
  region = "us-east-1"
}
"#;
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request(hcl, Environment::Prod, None))
        .await
        .unwrap();

    assert_eq!(response.estimated_monthly_cost, 30.37);
    assert_eq!(response.estimated_first_week_cost, 6.99);
    assert_eq!(response.pricing_confidence.as_str(), "high");
    assert_eq!(response.breakdown_by_resource.len(), 1);
    assert_eq!(
        response.breakdown_by_resource[0].resource_id,
        "x-t3.medium-us-east-1"
    );
}

#[tokio::test]
async fn scenario_budget_advisory() {
    let hcl = r#"
provider "aws" { region = "us-east-1" }
resource "aws_instance" "x" { instance_type = "t3.medium" }
"#;
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request(hcl, Environment::Prod, Some(10.0)))
        .await
        .unwrap();

    let policy_eval = response.policy_eval.as_ref().unwrap();
    assert_eq!(policy_eval.status, PolicyEvalStatus::Pass);
    assert!(response.risk_flags.contains(&"policy_advisory".to_string()));
}

#[tokio::test]
async fn scenario_blocking_policy_in_dev() {
    let hcl = r#"resource "aws_instance" "big" { instance_type = "m5.large" }"#;
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request(hcl, Environment::Dev, None))
        .await
        .unwrap();

    assert!(response.risk_flags.contains(&"policy_blocked".to_string()));
    assert_eq!(
        response.policy_eval.unwrap().status,
        PolicyEvalStatus::Fail
    );
}

#[tokio::test]
async fn scenario_gcp_mixed_model() {
    let hcl = r#"
provider "google" {
  region = "us-central1"
}

resource "google_compute_instance" "app" {
  count        = 2
  machine_type = "e2-standard-4"
}

resource "google_sql_database_instance" "db" {
  tier = "db-n1-standard-2"
}
"#;
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request(hcl, Environment::Prod, None))
        .await
        .unwrap();

    assert_eq!(response.breakdown_by_resource.len(), 2);
    let expected = round2(0.134 * 730.0 * 2.0 + 0.082 * 730.0);
    assert_eq!(response.estimated_monthly_cost, expected);
    assert_eq!(
        response.estimated_first_week_cost,
        round2(expected / 4.345)
    );
}

#[tokio::test]
async fn empty_model_boundary() {
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request("# nothing here", Environment::Dev, None))
        .await
        .unwrap();

    assert_eq!(response.estimated_monthly_cost, 0.0);
    assert_eq!(response.estimated_first_week_cost, 0.0);
    assert!(response.breakdown_by_resource.is_empty());
    assert_eq!(response.pricing_confidence.as_str(), "high");
    assert_eq!(response.policy_eval.unwrap().status, PolicyEvalStatus::Pass);
}

#[tokio::test]
async fn unknown_instance_fallback_boundary() {
    let hcl = r#"
resource "aws_instance" "weird" {
  count         = 3
  instance_type = "z13.colossal"
}
"#;
    let response = orchestrator()
        .await
        .check_cost_impact(&check_request(hcl, Environment::Prod, None))
        .await
        .unwrap();

    assert_eq!(response.estimated_monthly_cost, round2(0.10 * 730.0 * 3.0));
    assert_eq!(response.pricing_confidence.as_str(), "low");
}

#[tokio::test]
async fn policy_store_round_trip_through_engine() {
    let store = Arc::new(PolicyStore::in_memory().await);
    let engine = PolicyEngine::new(store.clone());

    let policy = Policy::budget("ci_budget", "CI Budget", 75.0);
    store.add_policy(policy.clone()).await;
    let fetched = engine.store().get_policy("ci_budget").await.unwrap();
    assert_eq!(fetched, policy);
}

#[tokio::test]
async fn resource_scoped_violation_count_is_bounded() {
    let hcl = r#"
resource "aws_instance" "a" { instance_type = "m5.large" }
resource "aws_instance" "b" { instance_type = "c5.xlarge" }
resource "aws_instance" "c" { instance_type = "t3.micro" }
"#;
    let model = parse_terraform_to_crmodel(hcl);
    let response = simulate_cost(&model);
    let engine = PolicyEngine::new(Arc::new(PolicyStore::in_memory().await));
    let result = engine
        .evaluate_policies(&model, &response, "dev", &[])
        .await;

    assert_eq!(result.overall_status, OverallStatus::Block);
    assert_eq!(result.blocking_violations.len(), 2);
    assert!(result.blocking_violations.len() <= model.len());
    for violation in &result.blocking_violations {
        assert!(violation.resource_id.is_some());
    }
}

#[tokio::test]
async fn simulation_results_are_deterministic_through_orchestrator() {
    let orchestrator = orchestrator().await;
    let request = check_request(
        r#"resource "aws_instance" "x" { instance_type = "t3.medium" }"#,
        Environment::Prod,
        None,
    );

    let first = orchestrator.check_cost_impact(&request).await.unwrap();
    let second = orchestrator.check_cost_impact(&request).await.unwrap();
    assert_eq!(first.estimated_monthly_cost, second.estimated_monthly_cost);
    assert_eq!(
        serde_json::to_value(&first.breakdown_by_resource).unwrap(),
        serde_json::to_value(&second.breakdown_by_resource).unwrap()
    );
}
