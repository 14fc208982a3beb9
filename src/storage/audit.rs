//! Audit event storage: append-only in-memory log with an optional durable
//! table, plus the query surface used by the API and compliance engine.

use sqlx::Row;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::{AuditEvent, AuditLogResponse, AuditQuery, AuditSortField, SortOrder};

use super::database::DatabasePool;

/// Upper bound on the in-memory event log.
const MEMORY_CAPACITY: usize = 10_000;

/// Append-only audit storage.
pub struct AuditStore {
    events: RwLock<Vec<AuditEvent>>,
    database: Option<DatabasePool>,
}

impl AuditStore {
    pub fn new(database: Option<DatabasePool>) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            database,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        true
    }

    /// Append an event. Durable write is best-effort.
    pub async fn store_event(&self, event: AuditEvent) {
        if let Some(database) = &self.database {
            if let Ok(body) = serde_json::to_string(&event) {
                let result = sqlx::query(
                    "INSERT OR REPLACE INTO audit_events \
                     (event_id, event_type, severity, timestamp, username, body) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&event.event_id)
                .bind(event.event_type.as_str())
                .bind(event.severity.as_str())
                .bind(event.timestamp.to_rfc3339())
                .bind(event.actor.username.as_deref())
                .bind(&body)
                .execute(database.pool())
                .await;
                if let Err(err) = result {
                    warn!(error = %err, "failed to persist audit event");
                }
            }
        }

        let mut events = self.events.write().await;
        events.push(event);
        if events.len() > MEMORY_CAPACITY {
            events.remove(0);
        }
    }

    /// Query events with filters, search, pagination and sorting.
    pub async fn query_events(&self, query: &AuditQuery) -> AuditLogResponse {
        let mut matched = self.matching_events(query).await;

        match (query.sort_by, query.sort_order) {
            (AuditSortField::Timestamp, SortOrder::Desc) => {
                matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp))
            }
            (AuditSortField::Timestamp, SortOrder::Asc) => {
                matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp))
            }
            (AuditSortField::Severity, SortOrder::Desc) => {
                matched.sort_by(|a, b| b.severity.cmp(&a.severity))
            }
            (AuditSortField::Severity, SortOrder::Asc) => {
                matched.sort_by(|a, b| a.severity.cmp(&b.severity))
            }
        }

        let total_count = matched.len();
        let page: Vec<AuditEvent> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        let has_more = query.offset + page.len() < total_count;

        AuditLogResponse {
            has_more,
            next_offset: has_more.then(|| query.offset + query.limit),
            events: page,
            total_count,
        }
    }

    async fn matching_events(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        // The durable table is the source of truth when attached; the
        // in-memory log covers DB-less deployments.
        if let Some(database) = &self.database {
            match self.load_all(database).await {
                Ok(events) => return Self::apply_filters(events, query),
                Err(err) => warn!(error = %err, "audit query against database failed, using memory"),
            }
        }
        Self::apply_filters(self.events.read().await.clone(), query)
    }

    async fn load_all(&self, database: &DatabasePool) -> crate::domain::Result<Vec<AuditEvent>> {
        let rows = sqlx::query("SELECT body FROM audit_events ORDER BY timestamp DESC LIMIT 10000")
            .fetch_all(database.pool())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let body: String = row.get("body");
                serde_json::from_str(&body).ok()
            })
            .collect())
    }

    fn apply_filters(events: Vec<AuditEvent>, query: &AuditQuery) -> Vec<AuditEvent> {
        events
            .into_iter()
            .filter(|event| {
                if let Some(start) = query.start_time {
                    if event.timestamp < start {
                        return false;
                    }
                }
                if let Some(end) = query.end_time {
                    if event.timestamp > end {
                        return false;
                    }
                }
                if let Some(types) = &query.event_types {
                    if !types.contains(&event.event_type) {
                        return false;
                    }
                }
                if let Some(severities) = &query.severities {
                    if !severities.contains(&event.severity) {
                        return false;
                    }
                }
                if let Some(usernames) = &query.usernames {
                    match &event.actor.username {
                        Some(username) if usernames.contains(username) => {}
                        _ => return false,
                    }
                }
                if let Some(resource_types) = &query.resource_types {
                    match &event.resource_type {
                        Some(resource_type) if resource_types.contains(resource_type) => {}
                        _ => return false,
                    }
                }
                if let Some(success) = query.success {
                    if event.success != success {
                        return false;
                    }
                }
                if let Some(term) = &query.search_term {
                    let term = term.to_lowercase();
                    let haystacks = [
                        Some(event.action.to_lowercase()),
                        event.actor.username.as_ref().map(|u| u.to_lowercase()),
                        event.resource_id.as_ref().map(|r| r.to_lowercase()),
                    ];
                    if !haystacks
                        .iter()
                        .flatten()
                        .any(|haystack| haystack.contains(&term))
                    {
                        return false;
                    }
                }
                true
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuditEventType, AuditSeverity};

    fn event(action: &str, severity: AuditSeverity, username: Option<&str>) -> AuditEvent {
        let mut event = AuditEvent::new(AuditEventType::ApiRequest, action).with_severity(severity);
        event.actor.username = username.map(str::to_string);
        event
    }

    #[tokio::test]
    async fn test_query_filters_by_severity() {
        let store = AuditStore::in_memory();
        store.store_event(event("a", AuditSeverity::Info, None)).await;
        store.store_event(event("b", AuditSeverity::Error, None)).await;

        let response = store
            .query_events(&AuditQuery {
                severities: Some(vec![AuditSeverity::Error]),
                ..Default::default()
            })
            .await;
        assert_eq!(response.total_count, 1);
        assert_eq!(response.events[0].action, "b");
    }

    #[tokio::test]
    async fn test_free_text_search() {
        let store = AuditStore::in_memory();
        store
            .store_event(event("POST /mcp/checkCostImpact", AuditSeverity::Info, Some("ci-bot")))
            .await;
        store
            .store_event(event("GET /mcp/policies", AuditSeverity::Info, Some("alice")))
            .await;

        let response = store
            .query_events(&AuditQuery {
                search_term: Some("ci-BOT".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(response.total_count, 1);
    }

    #[tokio::test]
    async fn test_pagination_signals() {
        let store = AuditStore::in_memory();
        for i in 0..5 {
            store
                .store_event(event(&format!("action-{i}"), AuditSeverity::Info, None))
                .await;
        }
        let response = store
            .query_events(&AuditQuery {
                limit: 2,
                offset: 0,
                ..Default::default()
            })
            .await;
        assert_eq!(response.events.len(), 2);
        assert!(response.has_more);
        assert_eq!(response.next_offset, Some(2));

        let response = store
            .query_events(&AuditQuery {
                limit: 2,
                offset: 4,
                ..Default::default()
            })
            .await;
        assert_eq!(response.events.len(), 1);
        assert!(!response.has_more);
        assert!(response.next_offset.is_none());
    }

    #[tokio::test]
    async fn test_severity_sorting() {
        let store = AuditStore::in_memory();
        store.store_event(event("low", AuditSeverity::Info, None)).await;
        store.store_event(event("high", AuditSeverity::Critical, None)).await;

        let response = store
            .query_events(&AuditQuery {
                sort_by: AuditSortField::Severity,
                sort_order: SortOrder::Desc,
                ..Default::default()
            })
            .await;
        assert_eq!(response.events[0].action, "high");
    }

    #[tokio::test]
    async fn test_durable_events_round_trip() {
        let database = DatabasePool::connect_in_memory().await.unwrap();
        let store = AuditStore::new(Some(database));
        store.store_event(event("persisted", AuditSeverity::Info, None)).await;

        let response = store.query_events(&AuditQuery::default()).await;
        assert_eq!(response.total_count, 1);
        assert_eq!(response.events[0].action, "persisted");
    }
}
