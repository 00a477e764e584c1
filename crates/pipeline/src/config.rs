use std::time::Duration;

/// Tunables for the fallback chain and candidate search.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Time box per tier attempt.
    pub tier_timeout: Duration,
    /// Rate-limit retries at the primary tier.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub retry_base_delay: Duration,
    /// Candidates offered to the provider per category.
    pub max_candidates: usize,
    /// Similarity floor for keyword candidates.
    pub keyword_min_score: f32,
    /// Similarity floor for problem candidates.
    pub problem_min_score: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tier_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            max_candidates: 15,
            keyword_min_score: 0.30,
            problem_min_score: 0.40,
        }
    }
}
