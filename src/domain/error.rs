use thiserror::Error;

/// Errors produced by the FinOpsGuard core.
#[derive(Error, Debug)]
pub enum FinOpsError {
    /// Client sent a structurally invalid request.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Request payload was not valid base64/UTF-8.
    #[error("invalid_payload_encoding")]
    InvalidPayloadEncoding,

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Validation failure on an entity (webhook, policy, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Cache failure. Callers treat these as soft and fall through.
    #[error("cache error: {0}")]
    Cache(String),

    /// Outbound HTTP failure (live pricing, webhook delivery).
    #[error("http error: {0}")]
    Http(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl FinOpsError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable slug used in API error bodies.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidPayloadEncoding => "invalid_payload_encoding",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Config(_) => "configuration_error",
            _ => "internal_error",
        }
    }
}

impl From<reqwest::Error> for FinOpsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<redis::RedisError> for FinOpsError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FinOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_slugs() {
        assert_eq!(FinOpsError::invalid_request("x").slug(), "invalid_request");
        assert_eq!(FinOpsError::InvalidPayloadEncoding.slug(), "invalid_payload_encoding");
        assert_eq!(FinOpsError::not_found("p").slug(), "not_found");
        assert_eq!(FinOpsError::internal("boom").slug(), "internal_error");
    }
}
