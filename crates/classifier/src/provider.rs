use crate::error::Result;
use crate::schema::{ClassificationRequest, RawClassification};

/// External structured-generation service seam.
///
/// Implementations send the feedback text plus the constrained
/// candidate subset and request a schema-conformant response. Error
/// classification (rate limit, timeout, unavailable) happens inside
/// the implementation; the tiers only see [`ClassifyError`]
/// (crate::ClassifyError) variants.
#[async_trait::async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<RawClassification>;
}
