use crate::config::PipelineConfig;
use crate::telemetry::{TelemetryEntry, TelemetryLedger};
use feedback_classifier::{
    emergency_result, CandidateSet, ClassificationResult, ClassifyError, HeuristicClassifier,
    PrimaryClassifier, TextualMatcher, Tier,
};
use feedback_taxonomy::Taxonomy;
use std::sync::Arc;
use std::time::Instant;

/// Per-item context the chain carries across tiers.
pub struct ChainInput<'a> {
    pub text: &'a str,
    pub candidates: &'a CandidateSet,
    pub taxonomy: &'a Taxonomy,
    pub taxonomy_version: u64,
    /// Explicit guest rating, when the channel provides one.
    pub rating: Option<u8>,
    /// Whether `candidates` came from embedding search; lands in
    /// telemetry on a primary success.
    pub embeddings_used: bool,
}

/// Degradation state machine over the four tiers.
///
/// Entry is always Primary; each typed tier failure advances via
/// [`Tier::next`], and Emergency cannot fail, so `classify` always
/// returns a result. Only a primary `RateLimited` is retried, with
/// exponential backoff, before the chain advances.
pub struct FallbackChain {
    primary: PrimaryClassifier,
    textual: TextualMatcher,
    heuristic: HeuristicClassifier,
    telemetry: Arc<TelemetryLedger>,
    config: PipelineConfig,
}

impl FallbackChain {
    pub fn new(
        primary: PrimaryClassifier,
        telemetry: Arc<TelemetryLedger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            primary,
            textual: TextualMatcher::new(),
            heuristic: HeuristicClassifier::new(),
            telemetry,
            config,
        }
    }

    pub async fn classify(&self, input: &ChainInput<'_>) -> ClassificationResult {
        let mut tier = Tier::Primary;
        let mut last_error = "unknown".to_string();

        loop {
            let started = Instant::now();
            let outcome = match tier {
                Tier::Primary => self.try_primary(input).await,
                Tier::Textual => {
                    self.textual
                        .classify(input.text, input.taxonomy, input.taxonomy_version)
                }
                Tier::Heuristic => Ok(self.heuristic.classify(
                    input.text,
                    input.rating,
                    input.taxonomy_version,
                )),
                Tier::Emergency => Ok(emergency_result(
                    input.text,
                    &last_error,
                    input.taxonomy_version,
                )),
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    let embeddings_used = tier == Tier::Primary && input.embeddings_used;
                    self.telemetry.record(
                        TelemetryEntry::success(
                            tier,
                            latency_ms,
                            result.confidence,
                            embeddings_used,
                        )
                        .with_text_length(input.text.chars().count()),
                    );
                    if tier != Tier::Primary {
                        log::info!(
                            "Classification degraded to {} tier (last error: {last_error})",
                            tier.as_str()
                        );
                    }
                    return result;
                }
                Err(err) => {
                    log::warn!("{} tier failed: {err}", tier.as_str());
                    self.telemetry.record(
                        TelemetryEntry::failure(tier, latency_ms, err.kind())
                            .with_text_length(input.text.chars().count()),
                    );
                    last_error = err.kind().to_string();
                    // Emergency cannot fail; next() is always Some here.
                    tier = tier.next().unwrap_or(Tier::Emergency);
                }
            }
        }
    }

    async fn try_primary(
        &self,
        input: &ChainInput<'_>,
    ) -> feedback_classifier::Result<ClassificationResult> {
        let mut attempt = 0u32;
        loop {
            let call = self
                .primary
                .classify(input.text, input.candidates, input.taxonomy_version);
            let result = match tokio::time::timeout(self.config.tier_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ClassifyError::Timeout(self.config.tier_timeout)),
            };

            match result {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    attempt += 1;
                    log::warn!(
                        "Primary rate limited, retry {attempt}/{} in {delay:?}",
                        self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_classifier::{
        ClassificationProvider, ClassificationRequest, RawClassification, SuggestionType,
    };
    use feedback_taxonomy::{ItemKind, TaxonomyItem};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingProvider {
        error: ClassifyError,
        calls: AtomicUsize,
    }

    impl FailingProvider {
        fn new(error: ClassifyError) -> Arc<Self> {
            Arc::new(Self {
                error,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ClassificationProvider for FailingProvider {
        async fn classify(
            &self,
            _request: &ClassificationRequest,
        ) -> feedback_classifier::Result<RawClassification> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(self.error.clone())
        }
    }

    struct OkProvider;

    #[async_trait::async_trait]
    impl ClassificationProvider for OkProvider {
        async fn classify(
            &self,
            _request: &ClassificationRequest,
        ) -> feedback_classifier::Result<RawClassification> {
            Ok(RawClassification {
                sentiment: 4,
                has_suggestion: false,
                suggestion_type: SuggestionType::None,
                suggestion_summary: String::new(),
                confidence: 0.9,
                issues: vec![],
                proposed_keyword_label: None,
                proposed_problem_label: None,
                reasoning: None,
            })
        }
    }

    fn taxonomy() -> Taxonomy {
        Taxonomy::new(
            vec![TaxonomyItem::new("kw1", "Tecnologia - Wi-fi", ItemKind::Keyword)
                .with_department("Tecnologia")],
            vec![TaxonomyItem::new("pb1", "Wi-fi Instável", ItemKind::Problem)],
            vec![TaxonomyItem::new("Tecnologia", "Tecnologia", ItemKind::Department)],
        )
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            retry_base_delay: Duration::from_millis(1),
            ..PipelineConfig::default()
        }
    }

    fn input<'a>(text: &'a str, candidates: &'a CandidateSet, taxonomy: &'a Taxonomy) -> ChainInput<'a> {
        ChainInput {
            text,
            candidates,
            taxonomy,
            taxonomy_version: 1,
            rating: None,
            embeddings_used: true,
        }
    }

    #[tokio::test]
    async fn primary_success_is_terminal() {
        let telemetry = Arc::new(TelemetryLedger::new());
        let chain = FallbackChain::new(
            PrimaryClassifier::new(Arc::new(OkProvider)),
            telemetry.clone(),
            fast_config(),
        );

        let candidates = CandidateSet::default();
        let taxonomy = taxonomy();
        let result = chain
            .classify(&input("internet boa", &candidates, &taxonomy))
            .await;

        assert_eq!(result.tier_used, Tier::Primary);
        let recent = telemetry.recent(10);
        assert_eq!(recent.len(), 1);
        assert!(recent[0].is_success());
        assert!(recent[0].embeddings_used);
    }

    #[tokio::test]
    async fn rate_limit_retries_then_falls_back() {
        let provider = FailingProvider::new(ClassifyError::RateLimited);
        let telemetry = Arc::new(TelemetryLedger::new());
        let chain = FallbackChain::new(
            PrimaryClassifier::new(provider.clone()),
            telemetry.clone(),
            fast_config(),
        );

        let candidates = CandidateSet::default();
        let taxonomy = taxonomy();
        let result = chain
            .classify(&input("o wi-fi caiu toda hora", &candidates, &taxonomy))
            .await;

        // Initial attempt plus max_retries.
        assert_eq!(provider.calls.load(Ordering::Relaxed), 4);
        assert_eq!(result.tier_used, Tier::Textual);

        let recent = telemetry.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].error_kind.as_deref(), Some("rate_limit"));
    }

    #[tokio::test]
    async fn non_retryable_error_advances_immediately() {
        let provider = FailingProvider::new(ClassifyError::ProviderUnavailable(
            "connection refused".to_string(),
        ));
        let telemetry = Arc::new(TelemetryLedger::new());
        let chain = FallbackChain::new(
            PrimaryClassifier::new(provider.clone()),
            telemetry.clone(),
            fast_config(),
        );

        let candidates = CandidateSet::default();
        let taxonomy = taxonomy();
        let result = chain
            .classify(&input("o wi-fi caiu", &candidates, &taxonomy))
            .await;

        assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
        assert_eq!(result.tier_used, Tier::Textual);
    }

    #[tokio::test]
    async fn empty_taxonomy_degrades_to_heuristic() {
        let provider = FailingProvider::new(ClassifyError::RateLimited);
        let telemetry = Arc::new(TelemetryLedger::new());
        let chain = FallbackChain::new(
            PrimaryClassifier::new(provider),
            telemetry.clone(),
            fast_config(),
        );

        let candidates = CandidateSet::default();
        let empty = Taxonomy::default();
        let result = chain
            .classify(&input("estadia péssima", &candidates, &empty))
            .await;

        assert_eq!(result.tier_used, Tier::Heuristic);
        assert_eq!(result.sentiment, 2);

        let kinds: Vec<Option<String>> = telemetry
            .recent(10)
            .into_iter()
            .map(|e| e.error_kind)
            .collect();
        // Newest first: heuristic success, textual failure, primary failure.
        assert_eq!(kinds[0], None);
        assert_eq!(kinds[1].as_deref(), Some("invalid_request"));
        assert_eq!(kinds[2].as_deref(), Some("rate_limit"));
    }

    #[tokio::test]
    async fn tier_order_is_fixed() {
        assert_eq!(Tier::Primary.next(), Some(Tier::Textual));
        assert_eq!(Tier::Textual.next(), Some(Tier::Heuristic));
        assert_eq!(Tier::Heuristic.next(), Some(Tier::Emergency));
        assert_eq!(Tier::Emergency.next(), None);
    }
}
