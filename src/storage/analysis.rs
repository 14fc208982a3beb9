//! Hybrid analysis store: in-memory ring of the newest records plus an
//! optional durable table. Single writer (the orchestrator), many readers.

use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::AnalysisItem;

use super::database::DatabasePool;

/// How many records the in-memory ring retains.
const RING_CAPACITY: usize = 1000;

/// One stored analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub request_id: String,
    pub started_at: String,
    pub duration_ms: i64,
    pub summary: String,
}

impl AnalysisRecord {
    pub fn new(request_id: impl Into<String>, duration_ms: i64, summary: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            started_at: Utc::now().to_rfc3339(),
            duration_ms,
            summary: summary.into(),
        }
    }

    fn to_item(&self) -> AnalysisItem {
        AnalysisItem {
            request_id: self.request_id.clone(),
            started_at: self.started_at.clone(),
            duration_ms: self.duration_ms,
            summary: self.summary.clone(),
        }
    }
}

/// Ring + durable analysis storage.
pub struct AnalysisStore {
    ring: RwLock<Vec<AnalysisRecord>>,
    database: Option<DatabasePool>,
}

impl AnalysisStore {
    pub fn new(database: Option<DatabasePool>) -> Self {
        Self {
            ring: RwLock::new(Vec::new()),
            database,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Prepend a record; evict the oldest past capacity. The durable write
    /// is best-effort.
    pub async fn add_analysis(&self, record: AnalysisRecord, result: Option<&Value>) {
        {
            let mut ring = self.ring.write().await;
            ring.insert(0, record.clone());
            if ring.len() > RING_CAPACITY {
                ring.pop();
            }
        }

        let Some(database) = &self.database else { return };
        let result_body = result.map(|r| r.to_string());
        let outcome = sqlx::query(
            "INSERT OR REPLACE INTO analyses (request_id, started_at, duration_ms, summary, result) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.request_id)
        .bind(&record.started_at)
        .bind(record.duration_ms)
        .bind(&record.summary)
        .bind(result_body)
        .execute(database.pool())
        .await;
        if let Err(err) = outcome {
            warn!(error = %err, "failed to persist analysis record");
        }
    }

    /// The most recent record, if any.
    pub async fn most_recent(&self) -> Option<AnalysisRecord> {
        self.ring.read().await.first().cloned()
    }

    /// Paginated listing, newest first. `after` is a `started_at` cursor.
    pub async fn list_analyses(
        &self,
        limit: usize,
        after: Option<&str>,
    ) -> (Vec<AnalysisItem>, Option<String>) {
        if let Some(database) = &self.database {
            match self.list_from_database(database, limit, after).await {
                Ok(result) if !result.0.is_empty() => return result,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "listing analyses from database failed, using ring");
                }
            }
        }

        let ring = self.ring.read().await;
        let start = match after {
            Some(cursor) => ring
                .iter()
                .position(|record| record.started_at.as_str() < cursor)
                .unwrap_or(ring.len()),
            None => 0,
        };
        let items: Vec<AnalysisItem> = ring
            .iter()
            .skip(start)
            .take(limit)
            .map(AnalysisRecord::to_item)
            .collect();
        let next_cursor = if start + limit < ring.len() {
            items.last().map(|item| item.started_at.clone())
        } else {
            None
        };
        (items, next_cursor)
    }

    async fn list_from_database(
        &self,
        database: &DatabasePool,
        limit: usize,
        after: Option<&str>,
    ) -> crate::domain::Result<(Vec<AnalysisItem>, Option<String>)> {
        let rows = match after {
            Some(cursor) => {
                sqlx::query(
                    "SELECT request_id, started_at, duration_ms, summary FROM analyses \
                     WHERE started_at < ? ORDER BY started_at DESC LIMIT ?",
                )
                .bind(cursor)
                .bind(limit as i64 + 1)
                .fetch_all(database.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT request_id, started_at, duration_ms, summary FROM analyses \
                     ORDER BY started_at DESC LIMIT ?",
                )
                .bind(limit as i64 + 1)
                .fetch_all(database.pool())
                .await?
            }
        };

        let has_more = rows.len() > limit;
        let items: Vec<AnalysisItem> = rows
            .into_iter()
            .take(limit)
            .map(|row| AnalysisItem {
                request_id: row.get("request_id"),
                started_at: row.get("started_at"),
                duration_ms: row.get("duration_ms"),
                summary: row.get("summary"),
            })
            .collect();
        let next_cursor = has_more.then(|| items.last().map(|i| i.started_at.clone())).flatten();
        Ok((items, next_cursor))
    }
}
