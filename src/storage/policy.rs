//! Hybrid policy store: durable table when the pool is present, in-memory
//! registry always. The public API is uniform across both modes.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::policy::{ExpressionOperator, PolicyExpression, PolicyOperator, PolicyRule};
use crate::domain::{Policy, PolicyViolationAction};

use super::database::DatabasePool;

/// Process-wide policy registry. Mutations are atomic per id; readers get
/// cloned snapshots.
pub struct PolicyStore {
    policies: RwLock<HashMap<String, Policy>>,
    database: Option<DatabasePool>,
}

impl PolicyStore {
    /// Create a store seeded with the default policies, loading any stored
    /// policies over them when a database is attached.
    pub async fn new(database: Option<DatabasePool>) -> Self {
        let mut policies = HashMap::new();
        for policy in default_policies() {
            policies.insert(policy.id.clone(), policy);
        }

        let store = Self {
            policies: RwLock::new(policies),
            database,
        };
        store.load_from_database().await;
        store
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Self {
        Self::new(None).await
    }

    async fn load_from_database(&self) {
        let Some(database) = &self.database else { return };
        let rows = match sqlx::query("SELECT body FROM policies")
            .fetch_all(database.pool())
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "failed to load policies from database");
                return;
            }
        };

        let mut policies = self.policies.write().await;
        for row in rows {
            let body: String = row.get("body");
            match serde_json::from_str::<Policy>(&body) {
                Ok(policy) => {
                    policies.insert(policy.id.clone(), policy);
                }
                Err(err) => warn!(error = %err, "skipping undecodable stored policy"),
            }
        }
    }

    async fn persist(&self, policy: &Policy) {
        let Some(database) = &self.database else { return };
        let body = match serde_json::to_string(policy) {
            Ok(body) => body,
            Err(_) => return,
        };
        let result = sqlx::query(
            "INSERT INTO policies (id, body, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(&policy.id)
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(database.pool())
        .await;
        if let Err(err) = result {
            warn!(error = %err, policy_id = %policy.id, "failed to persist policy");
        }
    }

    /// Add or replace a policy.
    pub async fn add_policy(&self, policy: Policy) {
        self.persist(&policy).await;
        self.policies.write().await.insert(policy.id.clone(), policy);
    }

    /// Update an existing policy, preserving its id. Returns false when the
    /// id is unknown.
    pub async fn update_policy(&self, policy_id: &str, mut updated: Policy) -> bool {
        {
            let policies = self.policies.read().await;
            if !policies.contains_key(policy_id) {
                return false;
            }
        }
        updated.id = policy_id.to_string();
        self.persist(&updated).await;
        self.policies
            .write()
            .await
            .insert(policy_id.to_string(), updated);
        true
    }

    /// Remove a policy. Returns false when the id is unknown.
    pub async fn remove_policy(&self, policy_id: &str) -> bool {
        let removed = self.policies.write().await.remove(policy_id).is_some();
        if removed {
            if let Some(database) = &self.database {
                if let Err(err) = sqlx::query("DELETE FROM policies WHERE id = ?")
                    .bind(policy_id)
                    .execute(database.pool())
                    .await
                {
                    warn!(error = %err, policy_id, "failed to delete stored policy");
                }
            }
        }
        removed
    }

    pub async fn get_policy(&self, policy_id: &str) -> Option<Policy> {
        self.policies.read().await.get(policy_id).cloned()
    }

    /// Snapshot of every policy.
    pub async fn list_policies(&self) -> Vec<Policy> {
        let mut policies: Vec<Policy> = self.policies.read().await.values().cloned().collect();
        policies.sort_by(|a, b| a.id.cmp(&b.id));
        policies
    }

    /// Snapshot of enabled policies.
    pub async fn enabled_policies(&self) -> Vec<Policy> {
        let mut policies: Vec<Policy> = self
            .policies
            .read()
            .await
            .values()
            .filter(|policy| policy.enabled)
            .cloned()
            .collect();
        policies.sort_by(|a, b| a.id.cmp(&b.id));
        policies
    }
}

/// Policies seeded at startup.
pub fn default_policies() -> Vec<Policy> {
    vec![
        Policy {
            id: "default_monthly_budget".to_string(),
            name: "Default Monthly Budget".to_string(),
            description: Some("Default monthly budget limit".to_string()),
            expression: None,
            budget: Some(1000.0),
            on_violation: PolicyViolationAction::Advisory,
            enabled: true,
        },
        Policy {
            id: "no_gpu_in_dev".to_string(),
            name: "No GPU Instances in Development".to_string(),
            description: Some("Prevent GPU instances in development environment".to_string()),
            expression: Some(PolicyExpression {
                rules: vec![
                    PolicyRule::new("resource.type", PolicyOperator::Eq, json!("aws_gpu_instance")),
                    PolicyRule::new("environment", PolicyOperator::Eq, json!("dev")),
                ],
                operator: ExpressionOperator::And,
            }),
            budget: None,
            on_violation: PolicyViolationAction::Advisory,
            enabled: true,
        },
        Policy {
            id: "no_large_instances_in_dev".to_string(),
            name: "No Large Instances in Development".to_string(),
            description: Some("Prevent large instance types in development environment".to_string()),
            expression: Some(PolicyExpression {
                rules: vec![
                    PolicyRule::new(
                        "resource.size",
                        PolicyOperator::In,
                        json!(["m5.large", "m5.xlarge", "m5.2xlarge", "c5.large", "c5.xlarge"]),
                    ),
                    PolicyRule::new("environment", PolicyOperator::Eq, json!("dev")),
                ],
                operator: ExpressionOperator::And,
            }),
            budget: None,
            on_violation: PolicyViolationAction::Block,
            enabled: true,
        },
    ]
}

/// Shared handle used across the service.
pub type SharedPolicyStore = std::sync::Arc<PolicyStore>;
