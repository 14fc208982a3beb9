//! Environment-driven service configuration.

use serde::{Deserialize, Serialize};

use crate::domain::{FinOpsError, Result};

/// Complete service settings, assembled from environment variables or an
/// optional TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Authentication settings. Accepted and surfaced for the middleware seam;
/// the enforcement layer is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_auth_mode")]
    pub mode: AuthMode,
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_jwt_expire")]
    pub jwt_expire_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    ApiKey,
    Jwt,
    Mtls,
    Oauth2,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/{}", password, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub live_enabled: bool,
    #[serde(default = "default_true")]
    pub fallback_to_static: bool,
    #[serde(default)]
    pub aws_enabled: bool,
    #[serde(default)]
    pub gcp_enabled: bool,
    #[serde(default)]
    pub azure_enabled: bool,
    #[serde(default, skip_serializing)]
    pub gcp_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_usage_ttl")]
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub console_logging: bool,
    #[serde(default = "default_true")]
    pub db_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: u64,
    #[serde(default = "default_retry_batch")]
    pub retry_batch_size: usize,
    #[serde(default = "default_cleanup_days")]
    pub cleanup_after_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auth_mode() -> AuthMode {
    AuthMode::ApiKey
}

fn default_jwt_expire() -> u64 {
    60
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_database_url() -> String {
    "sqlite://finopsguard.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_usage_ttl() -> u64 {
    3600
}

fn default_audit_log_file() -> String {
    "/var/log/finopsguard/audit.log".to_string()
}

fn default_retry_interval() -> u64 {
    60
}

fn default_retry_batch() -> usize {
    10
}

fn default_cleanup_days() -> i64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_auth_mode(),
            jwt_secret: None,
            jwt_expire_minutes: default_jwt_expire(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_database_url(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            live_enabled: false,
            fallback_to_static: true,
            aws_enabled: false,
            gcp_enabled: false,
            azure_enabled: false,
            gcp_api_key: None,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_ttl_seconds: default_usage_ttl(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: default_audit_log_file(),
            console_logging: false,
            db_logging: true,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            retry_interval_seconds: default_retry_interval(),
            retry_batch_size: default_retry_batch(),
            cleanup_after_days: default_cleanup_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Settings {
    /// Load settings from a TOML file. Missing sections take their
    /// defaults.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|err| FinOpsError::config(err.to_string()))
    }

    /// Assemble settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let auth_mode = match env_string("AUTH_MODE", "api_key").as_str() {
            "jwt" => AuthMode::Jwt,
            "mtls" => AuthMode::Mtls,
            "oauth2" => AuthMode::Oauth2,
            "all" => AuthMode::All,
            _ => AuthMode::ApiKey,
        };

        Ok(Self {
            server: ServerConfig {
                host: env_string("HOST", &default_host()),
                port: env_parse("PORT", default_port()),
            },
            auth: AuthConfig {
                enabled: env_bool("AUTH_ENABLED", false),
                mode: auth_mode,
                jwt_secret: std::env::var("JWT_SECRET").ok(),
                jwt_expire_minutes: env_parse("JWT_EXPIRE_MINUTES", default_jwt_expire()),
            },
            redis: RedisConfig {
                enabled: env_bool("REDIS_ENABLED", false),
                host: env_string("REDIS_HOST", &default_redis_host()),
                port: env_parse("REDIS_PORT", default_redis_port()),
                db: env_parse("REDIS_DB", 0),
                password: std::env::var("REDIS_PASSWORD").ok(),
            },
            database: DatabaseSettings {
                enabled: env_bool("DB_ENABLED", false),
                url: env_string("DATABASE_URL", &default_database_url()),
                pool_size: env_parse("DB_POOL_SIZE", default_pool_size()),
            },
            pricing: PricingConfig {
                live_enabled: env_bool("LIVE_PRICING_ENABLED", false),
                fallback_to_static: env_bool("PRICING_FALLBACK_TO_STATIC", true),
                aws_enabled: env_bool("AWS_PRICING_ENABLED", false),
                gcp_enabled: env_bool("GCP_PRICING_ENABLED", false),
                azure_enabled: env_bool("AZURE_PRICING_ENABLED", false),
                gcp_api_key: std::env::var("GCP_PRICING_API_KEY").ok(),
            },
            usage: UsageConfig {
                enabled: env_bool("USAGE_INTEGRATION_ENABLED", false),
                cache_ttl_seconds: env_parse("USAGE_CACHE_TTL_SECONDS", default_usage_ttl()),
            },
            audit: AuditConfig {
                enabled: env_bool("AUDIT_LOGGING_ENABLED", true),
                log_file: env_string("AUDIT_LOG_FILE", &default_audit_log_file()),
                console_logging: env_bool("AUDIT_CONSOLE_LOGGING", false),
                db_logging: env_bool("AUDIT_DB_LOGGING", true),
            },
            webhooks: WebhookConfig {
                retry_interval_seconds: env_parse("WEBHOOK_RETRY_INTERVAL", default_retry_interval()),
                retry_batch_size: env_parse("WEBHOOK_RETRY_BATCH_SIZE", default_retry_batch()),
                cleanup_after_days: env_parse("WEBHOOK_CLEANUP_DAYS", default_cleanup_days()),
            },
            logging: LoggingConfig {
                level: env_string("LOG_LEVEL", &default_log_level()),
                json: env_bool("LOG_JSON", false),
            },
        })
    }

    /// Defaults suitable for tests: everything external disabled.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            auth: AuthConfig {
                enabled: false,
                mode: AuthMode::ApiKey,
                jwt_secret: None,
                jwt_expire_minutes: default_jwt_expire(),
            },
            redis: RedisConfig {
                enabled: false,
                host: default_redis_host(),
                port: default_redis_port(),
                db: 0,
                password: None,
            },
            database: DatabaseSettings {
                enabled: false,
                url: "sqlite::memory:".to_string(),
                pool_size: 2,
            },
            pricing: PricingConfig {
                live_enabled: false,
                fallback_to_static: true,
                aws_enabled: false,
                gcp_enabled: false,
                azure_enabled: false,
                gcp_api_key: None,
            },
            usage: UsageConfig {
                enabled: false,
                cache_ttl_seconds: default_usage_ttl(),
            },
            audit: AuditConfig {
                enabled: true,
                log_file: String::new(),
                console_logging: false,
                db_logging: true,
            },
            webhooks: WebhookConfig {
                retry_interval_seconds: default_retry_interval(),
                retry_batch_size: default_retry_batch(),
                cleanup_after_days: default_cleanup_days(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.enabled && self.database.url.is_empty() {
            return Err(FinOpsError::config("DATABASE_URL must be set when DB_ENABLED"));
        }
        if self.database.pool_size == 0 {
            return Err(FinOpsError::config("DB_POOL_SIZE must be greater than 0"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Initialize the tracing subscriber from logging settings.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_tests() {
        let settings = Settings::for_tests();
        assert!(!settings.database.enabled);
        assert!(!settings.redis.enabled);
        assert!(settings.pricing.fallback_to_static);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_redis_url_with_password() {
        let mut config = Settings::for_tests().redis;
        config.password = Some("pw".to_string());
        assert_eq!(config.url(), "redis://:pw@localhost:6379/0");
        config.password = None;
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let mut settings = Settings::for_tests();
        settings.database.pool_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finopsguard.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[database]
enabled = true
url = "sqlite://guard.db"
"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(settings.database.enabled);
        assert_eq!(settings.webhooks.retry_interval_seconds, 60);
    }
}
