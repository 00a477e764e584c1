//! End-to-end pipeline tests against stub providers.

use feedback_classifier::{
    ClassificationProvider, ClassificationRequest, ClassifyError, RawClassification, RawIssue,
    SuggestionType, Tier,
};
use feedback_embeddings::{CacheConfig, EmbeddingCache, EmbeddingProvider, StubEmbeddingProvider};
use feedback_pipeline::{ClassificationPipeline, PipelineConfig, TelemetryLedger};
use feedback_taxonomy::{
    compute_version, ItemKind, MemoryVersionStore, NoEnrichment, StoredVersionInfo, Taxonomy,
    TaxonomyItem, VersionStore, VersionTracker,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Picks the top keyword candidate and reports a negative experience
/// against it, mirroring what the structured-generation service does
/// for a clear complaint.
struct EchoProvider;

#[async_trait::async_trait]
impl ClassificationProvider for EchoProvider {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> feedback_classifier::Result<RawClassification> {
        let keyword = request.candidates.keywords.first();
        let department_id = keyword
            .and_then(|k| k.department_id.clone())
            .or_else(|| request.candidates.departments.first().map(|d| d.id.clone()))
            .unwrap_or_else(|| "EMPTY".to_string());

        Ok(RawClassification {
            sentiment: 2,
            has_suggestion: false,
            suggestion_type: SuggestionType::None,
            suggestion_summary: String::new(),
            confidence: 0.85,
            issues: vec![RawIssue {
                department_id,
                keyword_id: keyword.map(|k| k.id.clone()).unwrap_or_default(),
                problem_id: request
                    .candidates
                    .problems
                    .first()
                    .map(|p| p.id.clone())
                    .unwrap_or_default(),
                detail: "reclamação clara do hóspede".to_string(),
                confidence: 0.85,
                proposed_keyword: None,
            }],
            proposed_keyword_label: None,
            proposed_problem_label: None,
            reasoning: None,
        })
    }
}

struct UnavailableProvider;

#[async_trait::async_trait]
impl ClassificationProvider for UnavailableProvider {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> feedback_classifier::Result<RawClassification> {
        Err(ClassifyError::ProviderUnavailable("503".to_string()))
    }
}

fn taxonomy() -> Taxonomy {
    Taxonomy::new(
        vec![
            TaxonomyItem::new("kw_wifi", "Tecnologia - Wi-fi", ItemKind::Keyword)
                .with_department("Tecnologia")
                .with_aliases(["wifi", "internet"]),
            TaxonomyItem::new("kw_cafe", "A&B - Café da manhã", ItemKind::Keyword)
                .with_department("A&B"),
        ],
        vec![
            TaxonomyItem::new("pb_wifi", "Internet Instável", ItemKind::Problem)
                .with_aliases(["wifi"]),
        ],
        vec![
            TaxonomyItem::new("Tecnologia", "Tecnologia", ItemKind::Department),
            TaxonomyItem::new("A&B", "A&B", ItemKind::Department),
        ],
    )
}

fn pipeline(
    provider: Arc<dyn ClassificationProvider>,
    store: Arc<MemoryVersionStore>,
) -> ClassificationPipeline {
    let embedder = Arc::new(StubEmbeddingProvider::new(32));
    let cache = Arc::new(EmbeddingCache::new(embedder, CacheConfig::default()));
    ClassificationPipeline::new(
        provider,
        cache,
        taxonomy(),
        VersionTracker::new(store),
        Arc::new(TelemetryLedger::new()),
        Box::new(NoEnrichment),
        PipelineConfig {
            retry_base_delay: Duration::from_millis(1),
            ..PipelineConfig::default()
        },
    )
}

#[tokio::test]
async fn happy_path_produces_consolidated_record() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(EchoProvider), store);

    let outcome = pipeline
        .classify("tecnologia - wi-fi caiu", None)
        .await;

    assert_eq!(outcome.result.tier_used, Tier::Primary);
    assert_eq!(outcome.record.rating, 2);
    assert_eq!(outcome.record.keywords, "Tecnologia - Wi-fi");
    assert_eq!(outcome.record.sectors, "Tecnologia");
    assert!(!outcome.record.needs_review);

    let stats = pipeline.telemetry().stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.success_rate, 100.0);
    assert_eq!(stats.embeddings_usage_rate, 100.0);
}

#[tokio::test]
async fn failing_provider_degrades_to_textual_tier() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(UnavailableProvider), store);

    let outcome = pipeline
        .classify("o wifi não funciona direito", None)
        .await;

    assert_eq!(outcome.result.tier_used, Tier::Textual);
    assert!(outcome.result.confidence >= 0.5 && outcome.result.confidence <= 0.7);
    assert_eq!(outcome.record.keywords, "Tecnologia - Wi-fi");
    assert_eq!(outcome.record.problems, "Internet Instável");
    assert!(outcome.record.needs_review || outcome.result.confidence >= 0.6);

    let stats = pipeline.telemetry().stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.error_kinds.get("provider_unavailable"), Some(&1));
}

#[tokio::test]
async fn first_run_marks_embeddings_for_current_version() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(EchoProvider), store.clone());

    pipeline.classify("o wifi caiu", None).await;

    let stored = store.load().await.unwrap().unwrap();
    let current = compute_version(&taxonomy()).version;
    assert_eq!(stored.embeddings_version, Some(current));
    assert_eq!(
        stored.version_info.map(|v| v.version),
        Some(current)
    );
}

#[tokio::test]
async fn drift_clears_cache_and_reconciles_version() {
    let store = Arc::new(MemoryVersionStore::new());
    // Seed a stale baseline, as if the taxonomy changed since the last
    // embedding run.
    store
        .save(&StoredVersionInfo {
            version_info: None,
            embeddings_version: Some(12345),
            embeddings_updated_at_ms: Some(0),
        })
        .await
        .unwrap();

    let pipeline = pipeline(Arc::new(EchoProvider), store.clone());
    pipeline.classify("o wifi caiu de novo", None).await;

    let stored = store.load().await.unwrap().unwrap();
    let current = compute_version(&taxonomy()).version;
    assert_eq!(stored.embeddings_version, Some(current));
}

struct BrokenEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed(&self, _texts: &[String]) -> feedback_embeddings::Result<Vec<Vec<f32>>> {
        Err(feedback_embeddings::EmbeddingError::ProviderUnavailable(
            "503".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        32
    }
}

#[tokio::test]
async fn failed_index_build_leaves_version_unmarked() {
    let store = Arc::new(MemoryVersionStore::new());
    store
        .save(&StoredVersionInfo {
            version_info: None,
            embeddings_version: Some(12345),
            embeddings_updated_at_ms: Some(0),
        })
        .await
        .unwrap();

    let cache = Arc::new(EmbeddingCache::new(
        Arc::new(BrokenEmbedder),
        CacheConfig::default(),
    ));
    let pipeline = ClassificationPipeline::new(
        Arc::new(EchoProvider),
        cache,
        taxonomy(),
        VersionTracker::new(store.clone()),
        Arc::new(TelemetryLedger::new()),
        Box::new(NoEnrichment),
        PipelineConfig::default(),
    );

    // The item still classifies through the department-only fallback.
    let outcome = pipeline.classify("o wifi caiu", None).await;
    assert_eq!(outcome.result.tier_used, Tier::Primary);

    // The store keeps the stale baseline, so the next item retries the
    // rebuild instead of believing the embeddings are current.
    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.embeddings_version, Some(12345));
}

#[tokio::test]
async fn repeated_texts_hit_the_embedding_cache() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(EchoProvider), store);

    pipeline.classify("o wifi caiu", None).await;
    let misses_after_first = pipeline.cache_stats().await.misses;
    pipeline.classify("o wifi caiu", None).await;
    let stats = pipeline.cache_stats().await;

    assert_eq!(stats.misses, misses_after_first);
    assert!(stats.hits > 0);
}

#[tokio::test]
async fn result_taxonomy_version_matches_content_version() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(EchoProvider), store);

    let outcome = pipeline.classify("o wifi caiu", None).await;
    assert_eq!(
        outcome.result.taxonomy_version,
        compute_version(&taxonomy()).version
    );
}

/// Stub embedder with a fixed per-call delay, to make any accidental
/// serialization across concurrent items visible in wall-clock time.
struct SlowEmbedder {
    inner: StubEmbeddingProvider,
    delay: Duration,
}

#[async_trait::async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, texts: &[String]) -> feedback_embeddings::Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[tokio::test]
async fn concurrent_items_overlap_on_candidate_search() {
    let delay = Duration::from_millis(200);
    let embedder = Arc::new(SlowEmbedder {
        inner: StubEmbeddingProvider::new(32),
        delay,
    });
    let cache = Arc::new(EmbeddingCache::new(embedder, CacheConfig::default()));
    let pipeline = ClassificationPipeline::new(
        Arc::new(EchoProvider),
        cache,
        taxonomy(),
        VersionTracker::new(Arc::new(MemoryVersionStore::new())),
        Arc::new(TelemetryLedger::new()),
        Box::new(NoEnrichment),
        PipelineConfig::default(),
    );

    // Warm the candidate index so only the per-item query embedding
    // pays the provider delay afterwards.
    pipeline.classify("o wifi caiu", None).await;

    let started = Instant::now();
    tokio::join!(
        pipeline.classify("quarto frio demais", None),
        pipeline.classify("café da manhã atrasou", None),
        pipeline.classify("piscina fechada cedo", None),
    );
    let elapsed = started.elapsed();

    // Three distinct texts embed once each; searches that queue behind
    // a shared index lock would take at least three delays.
    assert!(
        elapsed < delay * 2,
        "expected overlapping searches, took {elapsed:?}"
    );
}

/// Counts invocations; never reports an issue.
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ClassificationProvider for CountingProvider {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> feedback_classifier::Result<RawClassification> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(RawClassification {
            sentiment: 3,
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

#[tokio::test]
async fn empty_text_short_circuits_without_provider_call() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(provider.clone(), store);

    let outcome = pipeline.classify("", None).await;

    assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
    assert_eq!(outcome.result.tier_used, Tier::Primary);
    assert_eq!(outcome.result.sentiment, 3);
    assert!(outcome.result.needs_review);
    assert!(outcome.result.issues.is_empty());
    assert_eq!(outcome.record.rating, 3);
    assert_eq!(outcome.record.keywords, "");
}

#[tokio::test]
async fn unmatched_text_yields_reviewable_neutral_record() {
    let store = Arc::new(MemoryVersionStore::new());
    let pipeline = pipeline(Arc::new(UnavailableProvider), store);

    // No taxonomy word overlap and no sentiment signal: the textual
    // tier settles on a neutral result that must be flagged for review.
    let outcome = pipeline.classify("zzz qqq xxx", Some(5)).await;
    assert_eq!(outcome.result.tier_used, Tier::Textual);
    assert_eq!(outcome.record.rating, 3);
    assert!(outcome.record.needs_review);
    assert_eq!(outcome.record.keywords, "");
}
