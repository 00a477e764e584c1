//! # Feedback Pipeline
//!
//! End-to-end orchestration of feedback classification:
//!
//! ```text
//! text ──> drift check ──> candidate search ──> fallback chain ──> consolidation
//!              │                  │                   │
//!        VersionTracker     EmbeddingCache      TelemetryLedger
//! ```
//!
//! The facade [`ClassificationPipeline`] always produces a
//! [`ConsolidatedRecord`]: tier failures degrade through the chain
//! down to the emergency record instead of surfacing as errors.
//! Degradation is visible through `needs_review`, near-zero confidence
//! and the telemetry ledger.

mod candidates;
mod config;
mod consolidate;
mod coordinator;
mod telemetry;

pub use candidates::CandidateIndex;
pub use config::PipelineConfig;
pub use consolidate::{consolidate, ConsolidatedRecord};
pub use coordinator::{ChainInput, FallbackChain};
pub use telemetry::{LedgerStats, TelemetryEntry, TelemetryLedger};

use feedback_classifier::{
    CandidateSet, ClassificationProvider, ClassificationResult, PrimaryClassifier,
};
use feedback_embeddings::EmbeddingCache;
use feedback_taxonomy::{compute_version, EmbeddingsStatus, Taxonomy, TextEnricher, VersionTracker};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Consolidated record plus the classification it was flattened from.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: ConsolidatedRecord,
    pub result: ClassificationResult,
}

/// Long-lived classification service. Shared state is limited to the
/// embedding cache, the candidate index and the telemetry ledger, so
/// feedback items classify concurrently.
pub struct ClassificationPipeline {
    cache: Arc<EmbeddingCache>,
    taxonomy: Taxonomy,
    tracker: VersionTracker,
    telemetry: Arc<TelemetryLedger>,
    enricher: Box<dyn TextEnricher>,
    chain: FallbackChain,
    config: PipelineConfig,
    index: Mutex<Option<Arc<CandidateIndex>>>,
}

impl ClassificationPipeline {
    pub fn new(
        provider: Arc<dyn ClassificationProvider>,
        cache: Arc<EmbeddingCache>,
        taxonomy: Taxonomy,
        tracker: VersionTracker,
        telemetry: Arc<TelemetryLedger>,
        enricher: Box<dyn TextEnricher>,
        config: PipelineConfig,
    ) -> Self {
        let chain = FallbackChain::new(
            PrimaryClassifier::new(provider),
            telemetry.clone(),
            config.clone(),
        );
        Self {
            cache,
            taxonomy,
            tracker,
            telemetry,
            enricher,
            chain,
            config,
            index: Mutex::new(None),
        }
    }

    /// Classify one feedback item. Never fails: candidate-search
    /// problems degrade to a department-only candidate set and the
    /// chain bottoms out at the emergency record.
    pub async fn classify(&self, text: &str, rating: Option<u8>) -> PipelineOutcome {
        let index = self.ensure_index().await;

        // Search runs on a cloned handle, never under the index lock,
        // so concurrent items only share the embedding cache.
        let (candidates, embeddings_used, taxonomy_version) = match &index {
            Some(index) => match index.search(text, &self.cache, &self.config).await {
                Ok(set) => (set, true, index.version()),
                Err(err) => {
                    log::warn!("Candidate search failed, degrading to departments: {err}");
                    (self.departments_only(), false, index.version())
                }
            },
            None => (
                self.departments_only(),
                false,
                compute_version(&self.taxonomy).version,
            ),
        };

        let input = ChainInput {
            text,
            candidates: &candidates,
            taxonomy: &self.taxonomy,
            taxonomy_version,
            rating,
            embeddings_used,
        };
        let result = self.chain.classify(&input).await;
        let record = consolidate(&result);

        PipelineOutcome { record, result }
    }

    pub fn telemetry(&self) -> &TelemetryLedger {
        &self.telemetry
    }

    pub async fn cache_stats(&self) -> feedback_embeddings::CacheStats {
        self.cache.stats().await
    }

    /// Reconcile the embedding space with the current taxonomy and
    /// hand out the candidate index, rebuilding it when absent or
    /// stale. The guard is held across a rebuild so concurrent items
    /// share one build; version metadata is written only after the
    /// rebuild succeeded, so a failed build leaves the store marked
    /// stale and the next item retries.
    async fn ensure_index(&self) -> Option<Arc<CandidateIndex>> {
        let mut slot = self.index.lock().await;

        let status = match self.tracker.check_status(&self.taxonomy).await {
            Ok(status) => status,
            Err(err) => {
                log::warn!("Version check failed, keeping current embeddings: {err}");
                EmbeddingsStatus::UpToDate
            }
        };

        if status == EmbeddingsStatus::Outdated {
            log::info!("Taxonomy drift detected, clearing embedding cache");
            self.cache.clear().await;
            *slot = None;
        }

        if slot.is_none() {
            match CandidateIndex::build(&self.taxonomy, &self.cache, self.enricher.as_ref()).await
            {
                Ok(built) => {
                    *slot = Some(Arc::new(built));
                    if status != EmbeddingsStatus::UpToDate {
                        self.reconcile_version().await;
                    }
                }
                Err(err) => {
                    log::warn!("Candidate index build failed: {err}");
                    return None;
                }
            }
        }

        slot.clone()
    }

    async fn reconcile_version(&self) {
        match self.tracker.persist_version(&self.taxonomy).await {
            Ok(version) => {
                if let Err(err) = self.tracker.mark_embeddings_updated(version.version).await {
                    log::warn!("Failed to mark embeddings updated: {err}");
                }
            }
            Err(err) => log::warn!("Failed to persist taxonomy version: {err}"),
        }
    }

    /// Minimal candidate set when embeddings are unavailable: the
    /// provider can still place issues by department.
    fn departments_only(&self) -> CandidateSet {
        CandidateSet {
            departments: self
                .taxonomy
                .active_departments()
                .map(|item| feedback_classifier::CandidateRef {
                    id: item.id.clone(),
                    label: item.label.clone(),
                    department_id: None,
                    score: 1.0,
                    description: item.description.clone(),
                    examples: item.examples.clone(),
                })
                .collect(),
            keywords: Vec::new(),
            problems: Vec::new(),
        }
    }
}
