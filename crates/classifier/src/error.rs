use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifyError>;

/// Tier-failure taxonomy. Only `RateLimited` is retryable, and only at
/// the Primary tier; everything else advances the fallback chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("Classification provider rate limit exceeded")]
    RateLimited,

    #[error("Invalid classification request: {0}")]
    InvalidRequest(String),

    #[error("Classification timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response failed schema validation: {0}")]
    SchemaViolation(String),

    #[error("Classification provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Input text too short or empty")]
    InputTooShort,
}

impl ClassifyError {
    /// Stable identifier recorded in telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::RateLimited => "rate_limit",
            ClassifyError::InvalidRequest(_) => "invalid_request",
            ClassifyError::Timeout(_) => "timeout",
            ClassifyError::SchemaViolation(_) => "schema_violation",
            ClassifyError::ProviderUnavailable(_) => "provider_unavailable",
            ClassifyError::InputTooShort => "input_too_short",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifyError::RateLimited)
    }
}
