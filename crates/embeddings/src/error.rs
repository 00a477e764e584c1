use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Provider-boundary errors. These propagate typed to the caller and
/// are never cached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding provider rate limit exceeded")]
    RateLimited,

    #[error("Invalid embedding request: {0}")]
    InvalidRequest(String),

    #[error("Embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Cannot embed empty text")]
    EmptyText,
}
