//! Redis-backed caching with best-effort semantics.
//!
//! Every caller treats cache failures as misses: the value is recomputed
//! and the error is logged, never propagated.

pub mod analysis;
pub mod pricing;

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::config::RedisConfig;
use crate::domain::Result;

pub use analysis::AnalysisCache;
pub use pricing::PricingCache;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin async redis wrapper. Cloning shares the underlying multiplexed
/// connection.
#[derive(Clone)]
pub struct CacheClient {
    connection: Option<redis::aio::MultiplexedConnection>,
}

impl CacheClient {
    /// Connect if enabled; a failed connection yields a disabled client.
    pub async fn connect(config: &RedisConfig) -> Self {
        if !config.enabled {
            return Self { connection: None };
        }

        let client = match redis::Client::open(config.url()) {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "invalid redis configuration, caching disabled");
                return Self { connection: None };
            }
        };

        match tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_tokio_connection()).await
        {
            Ok(Ok(connection)) => {
                debug!("redis cache connected");
                Self {
                    connection: Some(connection),
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "redis connection failed, caching disabled");
                Self { connection: None }
            }
            Err(_) => {
                warn!("redis connection timed out, caching disabled");
                Self { connection: None }
            }
        }
    }

    /// A client with no backing store; every get misses, every set is a no-op.
    pub fn disabled() -> Self {
        Self { connection: None }
    }

    pub fn is_available(&self) -> bool {
        self.connection.is_some()
    }

    /// Fetch and deserialize a value. Errors degrade to `None`.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut connection = self.connection.clone()?;
        let result: Result<Option<String>> = async {
            let value = tokio::time::timeout(OPERATION_TIMEOUT, connection.get(key))
                .await
                .map_err(|_| crate::domain::FinOpsError::Cache("redis get timed out".into()))??;
            Ok(value)
        }
        .await;

        match result {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, key, "cache read failed");
                None
            }
        }
    }

    /// Serialize and store a value with a TTL. Best-effort.
    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Some(mut connection) = self.connection.clone() else {
            return false;
        };
        let Ok(raw) = serde_json::to_string(value) else {
            return false;
        };
        let result: std::result::Result<_, _> = tokio::time::timeout(
            OPERATION_TIMEOUT,
            connection.set_ex::<_, _, ()>(key, raw, ttl.as_secs()),
        )
        .await;

        match result {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, key, "cache write failed");
                false
            }
            Err(_) => {
                warn!(key, "cache write timed out");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut connection) = self.connection.clone() else {
            return false;
        };
        matches!(
            tokio::time::timeout(OPERATION_TIMEOUT, connection.del::<_, ()>(key)).await,
            Ok(Ok(()))
        )
    }

    /// Round-trip health probe.
    pub async fn ping(&self) -> bool {
        let Some(mut connection) = self.connection.clone() else {
            return false;
        };
        let result: std::result::Result<_, _> = tokio::time::timeout(
            OPERATION_TIMEOUT,
            redis::cmd("PING").query_async::<_, String>(&mut connection),
        )
        .await;
        matches!(result, Ok(Ok(_)))
    }
}

/// Hex-encoded sha-256 of arbitrary bytes, used for content-addressed keys.
pub fn content_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_misses() {
        let cache = CacheClient::disabled();
        assert!(!cache.is_available());
        let value: Option<String> = cache.get_json("k").await;
        assert!(value.is_none());
        assert!(!cache.set_json("k", &"v", Duration::from_secs(1)).await);
        assert!(!cache.ping().await);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"").len(), 64);
    }
}
