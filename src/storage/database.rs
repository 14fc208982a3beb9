//! Database connection and pool management.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::config::DatabaseSettings;
use crate::domain::{FinOpsError, Result};

/// Durable-store connection pool. Absent when `DB_ENABLED` is off or the
/// connection failed; every store falls back to in-memory state.
#[derive(Clone)]
pub struct DatabasePool {
    pool: Pool<Sqlite>,
}

impl DatabasePool {
    /// Connect and initialize the schema.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        if settings.url.is_empty() {
            return Err(FinOpsError::config("database URL cannot be empty"));
        }

        info!(url = %settings.url, "creating database connection pool");

        let options = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        // An in-memory database exists per connection; a pool larger than
        // one would see a different empty database on every checkout.
        let max_connections = if settings.url.contains(":memory:") {
            1
        } else {
            settings.pool_size
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.init_schema().await?;

        info!("database pool ready");
        Ok(database)
    }

    /// In-memory database for tests.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::connect(&DatabaseSettings {
            enabled: true,
            url: "sqlite::memory:".to_string(),
            pool_size: 2,
        })
        .await
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create tables if they do not exist.
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS policies (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                request_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                summary TEXT NOT NULL,
                result TEXT
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_analyses_started_at ON analyses (started_at DESC)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS webhooks (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS webhook_deliveries (
                id TEXT PRIMARY KEY,
                webhook_id TEXT NOT NULL,
                status TEXT NOT NULL,
                next_retry_at TEXT,
                created_at TEXT NOT NULL,
                body TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_deliveries_status ON webhook_deliveries (status, next_retry_at)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                event_id TEXT PRIMARY KEY,
                event_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                username TEXT,
                body TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_events (timestamp DESC)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Liveness probe.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_and_schema() {
        let database = DatabasePool::connect_in_memory().await.unwrap();
        assert!(database.health_check().await.is_ok());

        // Schema is idempotent.
        assert!(database.init_schema().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let settings = DatabaseSettings {
            enabled: true,
            url: String::new(),
            pool_size: 2,
        };
        assert!(DatabasePool::connect(&settings).await.is_err());
    }
}
