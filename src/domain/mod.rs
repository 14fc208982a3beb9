//! Shared domain types: the canonical resource model, API shapes, policy DSL,
//! webhook and audit entities, and the crate error type.

pub mod api;
pub mod audit;
pub mod error;
pub mod policy;
pub mod resource;
pub mod usage;
pub mod webhook;

pub use api::{
    AnalysisItem, CheckRequest, CheckResponse, CloudProvider, Environment, IacType, ListQuery,
    ListResponse, PolicyEvalStatus, PolicyEvaluation, PolicyRequest, PolicyRequestMode,
    PriceCatalogItem, PriceCatalogResponse, PriceQuery, PriceUnit, Recommendation,
    RecommendationKind, ResourceBreakdownItem, SuggestRequest, SuggestResponse,
};
pub use audit::{
    AuditActor, AuditEvent, AuditEventType, AuditHttpContext, AuditLogResponse, AuditQuery,
    AuditSeverity, AuditSortField, ComplianceReport, ComplianceStatus, SortOrder,
};
pub use error::{FinOpsError, Result};
pub use policy::{
    ExpressionOperator, OverallStatus, Policy, PolicyEvaluationResult, PolicyExpression,
    PolicyOperator, PolicyOutcome, PolicyRule, PolicyStatus, PolicyViolation,
    PolicyViolationAction,
};
pub use resource::{
    round2, CanonicalResource, CanonicalResourceModel, PriceQuote, PricingConfidence,
};
pub use usage::{CostUsageRecord, Granularity, ResourceUsage, UsageMetric, UsageQuery, UsageSummary};
pub use webhook::{
    Webhook, WebhookCreateRequest, WebhookDelivery, WebhookEvent, WebhookEventType, WebhookStatus,
    WebhookTestRequest, WebhookTestResponse, WebhookUpdateRequest,
};
