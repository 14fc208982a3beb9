//! FinOpsGuard - cost-aware guardrails for Infrastructure-as-Code changes.
//!
//! Parses Terraform/Ansible documents into a cloud-neutral resource model,
//! estimates monthly cost against AWS/GCP/Azure catalogs, evaluates
//! governance policies, and emits webhook and audit side-effects.

pub mod api;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod metrics;
pub mod parsers;
pub mod pricing;
pub mod storage;
pub mod usage;
pub mod webhooks;

// Re-export commonly used types
pub use domain::{
    CanonicalResource, CanonicalResourceModel, CheckRequest, CheckResponse, Environment,
    FinOpsError, IacType, Policy, PolicyEvaluationResult, PriceQuote, PricingConfidence,
    ResourceBreakdownItem, Result,
};

pub use engine::{simulate_cost, AnalysisOrchestrator, PolicyEngine};

pub use parsers::{parse, parse_ansible_to_crmodel, parse_terraform_to_crmodel};

pub use pricing::PricingFactory;

pub use storage::{AnalysisStore, AuditStore, DatabasePool, PolicyStore, WebhookStore};

pub use webhooks::{sign_payload, WebhookDeliveryService, WebhookEventService, WebhookTaskService};

pub use audit::{AuditLogger, ComplianceEngine};

pub use api::{build_test_state, create_router, Application, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
