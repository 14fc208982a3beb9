//! HTTP handlers for the MCP, webhook and audit endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::audit::{AuditLogger, ComplianceEngine};
use crate::cache::CacheClient;
use crate::domain::webhook::{
    WebhookCreateRequest, WebhookEvent, WebhookEventType, WebhookTestRequest, WebhookTestResponse,
    WebhookUpdateRequest,
};
use crate::domain::{
    AuditQuery, CheckRequest, CloudProvider, FinOpsError, ListQuery, Policy, PolicyEvalStatus,
    PolicyRequest, PriceCatalogResponse, PriceQuery, SuggestResponse,
};
use crate::engine::{build_evaluation_context, simulate_cost, AnalysisOrchestrator};
use crate::pricing::aws::list_aws_ec2_ondemand;
use crate::pricing::PricingFactory;
use crate::storage::{AnalysisStore, DatabasePool, WebhookStore};
use crate::usage::UsageFactory;
use crate::webhooks::WebhookEventService;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub analysis_store: Arc<AnalysisStore>,
    pub webhook_store: Arc<WebhookStore>,
    pub webhook_events: Arc<WebhookEventService>,
    pub audit: Arc<AuditLogger>,
    pub compliance: Arc<ComplianceEngine>,
    pub pricing: PricingFactory,
    pub usage: Arc<UsageFactory>,
    pub cache: CacheClient,
    pub database: Option<DatabasePool>,
}

/// Error envelope: `{error: <slug>, detail: <message>}`.
pub struct ApiError(FinOpsError);

impl From<FinOpsError> for ApiError {
    fn from(err: FinOpsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FinOpsError::InvalidRequest(_)
            | FinOpsError::InvalidPayloadEncoding
            | FinOpsError::Validation(_) => StatusCode::BAD_REQUEST,
            FinOpsError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.slug(),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// --- MCP surface ---

/// Endpoint inventory at `/mcp`.
pub async fn mcp_index() -> impl IntoResponse {
    Json(json!({
        "endpoints": [
            "POST /mcp/checkCostImpact",
            "POST /mcp/suggestOptimizations",
            "POST /mcp/evaluatePolicy",
            "POST /mcp/getPriceCatalog",
            "POST /mcp/listRecentAnalyses",
            "GET /mcp/policies",
            "POST /mcp/policies",
            "GET /mcp/policies/{policy_id}",
            "PUT /mcp/policies/{policy_id}",
            "DELETE /mcp/policies/{policy_id}",
        ]
    }))
}

pub async fn check_cost_impact(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.orchestrator.check_cost_impact(&request).await?;
    Ok(Json(response))
}

pub async fn suggest_optimizations() -> impl IntoResponse {
    Json(SuggestResponse {
        suggestions: Vec::new(),
    })
}

pub async fn evaluate_policy(
    State(state): State<AppState>,
    Json(request): Json<PolicyRequest>,
) -> ApiResult<impl IntoResponse> {
    use base64::Engine as _;

    let policy = state
        .orchestrator
        .policy_engine()
        .store()
        .get_policy(&request.policy_id)
        .await
        .ok_or_else(|| FinOpsError::not_found(format!("Policy {} not found", request.policy_id)))?;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&request.iac_payload)
        .map_err(|_| FinOpsError::InvalidPayloadEncoding)?;
    let payload_text =
        String::from_utf8(decoded).map_err(|_| FinOpsError::InvalidPayloadEncoding)?;

    let model = crate::parsers::parse(&payload_text, request.iac_type);
    let response = simulate_cost(&model);
    let environment = request
        .environment
        .map(|environment| environment.as_str().to_string())
        .unwrap_or_else(|| "dev".to_string());
    let context = build_evaluation_context(&model, &response, &environment);
    let outcome = policy.evaluate(&context);

    // The request mode labels the caller's intent; a failed policy reports
    // fail either way and the CI pipeline decides whether that blocks.
    let status = match outcome.status {
        crate::domain::policy::PolicyStatus::Fail => PolicyEvalStatus::Fail,
        crate::domain::policy::PolicyStatus::Pass => PolicyEvalStatus::Pass,
    };

    Ok(Json(json!({
        "status": status,
        "policy_id": outcome.policy_id,
        "reason": outcome.reason,
    })))
}

pub async fn get_price_catalog(
    State(state): State<AppState>,
    Json(query): Json<PriceQuery>,
) -> ApiResult<impl IntoResponse> {
    use crate::domain::{PriceCatalogItem, PriceUnit, PricingConfidence};

    let mut confidence = PricingConfidence::High;
    let items = match (query.cloud, &query.instance_types) {
        // The AWS EC2 table is region-keyed and enumerable.
        (CloudProvider::Aws, _) => {
            list_aws_ec2_ondemand(query.region.as_deref(), query.instance_types.as_deref())
        }
        // Other clouds resolve requested SKUs through the quote factory.
        (cloud, Some(instance_types)) => {
            let region = query.region.clone().unwrap_or_else(|| {
                match cloud {
                    CloudProvider::Gcp => "us-central1",
                    _ => "eastus",
                }
                .to_string()
            });
            let mut items = Vec::with_capacity(instance_types.len());
            for sku in instance_types {
                let quote = state.pricing.instance_price(cloud, sku, &region).await;
                confidence = confidence.min(quote.confidence);
                items.push(PriceCatalogItem {
                    sku: sku.clone(),
                    description: Some(format!("{cloud} {sku} on-demand in {region}")),
                    region: region.clone(),
                    unit: PriceUnit::Hour,
                    price: quote.hourly_price,
                    attributes: None,
                });
            }
            items
        }
        _ => Vec::new(),
    };

    if items.is_empty() {
        confidence = PricingConfidence::Low;
    }

    Ok(Json(PriceCatalogResponse {
        updated_at: Utc::now().to_rfc3339(),
        pricing_confidence: confidence,
        items,
    }))
}

/// Advisory usage summary from the cloud billing/monitoring adapters.
pub async fn usage_summary(
    State(state): State<AppState>,
    Json(query): Json<crate::domain::UsageQuery>,
) -> ApiResult<impl IntoResponse> {
    if !state.usage.is_enabled() {
        return Ok(Json(json!({"available": false, "reason": "usage integration disabled"})));
    }
    match state.usage.usage_summary(&query).await? {
        Some(summary) => Ok(Json(json!({"available": true, "summary": summary}))),
        None => Ok(Json(json!({"available": false, "reason": "adapter unavailable"}))),
    }
}

pub async fn list_recent_analyses(
    State(state): State<AppState>,
    Json(query): Json<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let (items, next_cursor) = state
        .analysis_store
        .list_analyses(query.limit.unwrap_or(20), query.after.as_deref())
        .await;
    Ok(Json(crate::domain::ListResponse { items, next_cursor }))
}

// --- policy CRUD ---

pub async fn list_policies(State(state): State<AppState>) -> impl IntoResponse {
    let policies = state
        .orchestrator
        .policy_engine()
        .store()
        .list_policies()
        .await;
    let summaries: Vec<_> = policies
        .iter()
        .map(|policy| {
            json!({
                "id": policy.id,
                "name": policy.name,
                "description": policy.description,
                "enabled": policy.enabled,
                "on_violation": policy.on_violation,
                "has_budget": policy.budget.is_some(),
                "has_rules": policy.expression.is_some(),
            })
        })
        .collect();
    Json(json!({"policies": summaries}))
}

pub async fn get_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let policy = state
        .orchestrator
        .policy_engine()
        .store()
        .get_policy(&policy_id)
        .await
        .ok_or_else(|| FinOpsError::not_found(format!("Policy {policy_id} not found")))?;
    Ok(Json(policy))
}

pub async fn create_policy(
    State(state): State<AppState>,
    Json(policy): Json<Policy>,
) -> ApiResult<impl IntoResponse> {
    if policy.id.is_empty() {
        return Err(FinOpsError::invalid_request("policy id is required").into());
    }

    let store = state.orchestrator.policy_engine().store().clone();
    store.add_policy(policy.clone()).await;

    state
        .audit
        .log_policy_change(&policy.id, &policy.name, "created", None)
        .await;
    let policy_json = serde_json::to_value(&policy).unwrap_or(json!({}));
    let events = state.webhook_events.clone();
    tokio::spawn(async move {
        events.send_policy_created_event(&policy_json, "api").await;
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": format!("Policy {} created successfully", policy.id)})),
    ))
}

pub async fn update_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
    Json(policy): Json<Policy>,
) -> ApiResult<impl IntoResponse> {
    let store = state.orchestrator.policy_engine().store().clone();
    if !store.update_policy(&policy_id, policy.clone()).await {
        return Err(FinOpsError::not_found(format!("Policy {policy_id} not found")).into());
    }

    state
        .audit
        .log_policy_change(&policy_id, &policy.name, "updated", None)
        .await;
    let mut policy_json = serde_json::to_value(&policy).unwrap_or(json!({}));
    policy_json["id"] = json!(policy_id);
    let events = state.webhook_events.clone();
    tokio::spawn(async move {
        events.send_policy_updated_event(&policy_json, "api").await;
    });

    Ok(Json(json!({"message": format!("Policy {policy_id} updated successfully")})))
}

pub async fn delete_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.orchestrator.policy_engine().store().clone();
    let policy = store.get_policy(&policy_id).await;
    if !store.remove_policy(&policy_id).await {
        return Err(FinOpsError::not_found(format!("Policy {policy_id} not found")).into());
    }

    let policy_name = policy.map(|p| p.name).unwrap_or_default();
    state
        .audit
        .log_policy_change(&policy_id, &policy_name, "deleted", None)
        .await;
    let events = state.webhook_events.clone();
    let deleted_id = policy_id.clone();
    tokio::spawn(async move {
        events
            .send_policy_deleted_event(&deleted_id, &policy_name, "api")
            .await;
    });

    Ok(Json(json!({"message": format!("Policy {policy_id} deleted successfully")})))
}

// --- webhook management ---

/// Webhook representation for API responses; the signing secret never
/// leaves the store.
fn webhook_view(webhook: &crate::domain::webhook::Webhook) -> serde_json::Value {
    let mut view = serde_json::to_value(webhook).unwrap_or(json!({}));
    if let Some(map) = view.as_object_mut() {
        map.remove("secret");
    }
    view
}

pub async fn create_webhook(
    State(state): State<AppState>,
    Json(request): Json<WebhookCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    let webhook = request.into_webhook()?;
    state.webhook_store.create_webhook(webhook.clone()).await;
    Ok((StatusCode::CREATED, Json(webhook_view(&webhook))))
}

pub async fn list_webhooks(State(state): State<AppState>) -> impl IntoResponse {
    let webhooks = state.webhook_store.list_webhooks().await;
    let views: Vec<_> = webhooks.iter().map(webhook_view).collect();
    let total = views.len();
    Json(json!({"webhooks": views, "total": total}))
}

pub async fn get_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let webhook = state
        .webhook_store
        .get_webhook(&webhook_id)
        .await
        .ok_or_else(|| FinOpsError::not_found(format!("Webhook {webhook_id} not found")))?;
    Ok(Json(webhook_view(&webhook)))
}

pub async fn update_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    Json(request): Json<WebhookUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut webhook = state
        .webhook_store
        .get_webhook(&webhook_id)
        .await
        .ok_or_else(|| FinOpsError::not_found(format!("Webhook {webhook_id} not found")))?;
    request.apply(&mut webhook)?;
    state.webhook_store.update_webhook(webhook.clone()).await;
    Ok(Json(webhook_view(&webhook)))
}

pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.webhook_store.delete_webhook(&webhook_id).await {
        return Err(FinOpsError::not_found(format!("Webhook {webhook_id} not found")).into());
    }
    Ok(Json(json!({"message": format!("Webhook {webhook_id} deleted")})))
}

pub async fn list_webhook_deliveries(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if state.webhook_store.get_webhook(&webhook_id).await.is_none() {
        return Err(FinOpsError::not_found(format!("Webhook {webhook_id} not found")).into());
    }
    let deliveries = state.webhook_store.list_deliveries(&webhook_id, 100).await;
    let total = deliveries.len();
    Ok(Json(json!({"deliveries": deliveries, "total": total})))
}

pub async fn test_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    Json(request): Json<WebhookTestRequest>,
) -> ApiResult<impl IntoResponse> {
    let webhook = state
        .webhook_store
        .get_webhook(&webhook_id)
        .await
        .ok_or_else(|| FinOpsError::not_found(format!("Webhook {webhook_id} not found")))?;

    let event_type = request.event_type.unwrap_or(WebhookEventType::CostAnomaly);
    let data = request
        .custom_data
        .unwrap_or_else(|| json!({"test": true, "timestamp": Utc::now()}));
    let event = WebhookEvent::new(event_type, data);

    let success = state
        .webhook_events
        .delivery_service()
        .deliver_event(&webhook, &event)
        .await;

    let delivery = state
        .webhook_store
        .list_deliveries(&webhook_id, 1)
        .await
        .into_iter()
        .next();

    Ok(Json(WebhookTestResponse {
        success,
        delivery_id: delivery.as_ref().map(|d| d.id.clone()),
        response_status: delivery.as_ref().and_then(|d| d.response_status),
        error_message: delivery.and_then(|d| d.error_message),
    }))
}

// --- audit surface ---

pub async fn query_audit_events(
    State(state): State<AppState>,
    Json(query): Json<AuditQuery>,
) -> impl IntoResponse {
    Json(state.audit.store().query_events(&query).await)
}

#[derive(Debug, Deserialize)]
pub struct ComplianceReportRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub async fn compliance_report(
    State(state): State<AppState>,
    Json(request): Json<ComplianceReportRequest>,
) -> impl IntoResponse {
    Json(
        state
            .compliance
            .generate_report(request.start_time, request.end_time)
            .await,
    )
}

// --- health & metrics ---

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(pool) => match pool.health_check().await {
            Ok(()) => "ok",
            Err(_) => "unavailable",
        },
        None => "disabled",
    };
    let cache = if state.cache.is_available() {
        if state.cache.ping().await {
            "ok"
        } else {
            "unavailable"
        }
    } else {
        "disabled"
    };

    Json(json!({
        "status": "ok",
        "components": {
            "api": "ok",
            "database": database,
            "cache": cache,
        }
    }))
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
}
