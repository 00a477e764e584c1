use crate::error::{Result, TaxonomyError};
use crate::types::{Taxonomy, TaxonomyItem};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Deterministic version of the taxonomy content.
///
/// Equal content always yields the equal version; changing a single
/// item's id, label or status changes the owning category hash and
/// therefore the combined version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyVersion {
    pub version: u64,
    pub keywords_hash: String,
    pub problems_hash: String,
    pub departments_hash: String,
    pub keywords_count: usize,
    pub problems_count: usize,
    pub departments_count: usize,
    pub updated_at_ms: u64,
}

/// Per-category change counts. `modified` is binary: the category hash
/// differs but item counts match, so we only know *something* changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl CategoryDelta {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

/// Outcome of comparing the current taxonomy against the persisted
/// baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    pub has_changes: bool,
    pub keywords: CategoryDelta,
    pub problems: CategoryDelta,
    pub departments: CategoryDelta,
    pub embeddings_outdated: bool,
    pub recommend_regeneration: bool,
    pub last_embeddings_version: Option<u64>,
    pub current_version: u64,
}

impl ChangeReport {
    pub fn total_changes(&self) -> usize {
        self.keywords.total() + self.problems.total() + self.departments.total()
    }
}

/// Whether cached taxonomy embeddings can still be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingsStatus {
    UpToDate,
    Missing,
    Outdated,
}

/// Version metadata as persisted in the external document store.
///
/// `embeddings_version` is written separately from `version_info` so
/// that embedding-regeneration completion is tracked independently of
/// taxonomy-content persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredVersionInfo {
    pub version_info: Option<TaxonomyVersion>,
    pub embeddings_version: Option<u64>,
    pub embeddings_updated_at_ms: Option<u64>,
}

/// Persistence seam for version metadata. The exact storage layout is
/// the collaborator's concern; this crate only needs get/set.
#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredVersionInfo>>;
    async fn save(&self, info: &StoredVersionInfo) -> Result<()>;
}

/// In-memory store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryVersionStore {
    inner: tokio::sync::Mutex<Option<StoredVersionInfo>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryVersionStore {
    async fn load(&self) -> Result<Option<StoredVersionInfo>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, info: &StoredVersionInfo) -> Result<()> {
        *self.inner.lock().await = Some(info.clone());
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hash of one category: sorted `id:label:status` tuples joined with
/// `|`, truncated sha256 hex.
pub fn category_hash(items: &[TaxonomyItem]) -> String {
    let mut tuples: Vec<String> = items
        .iter()
        .map(|item| format!("{}:{}:{}", item.id, item.label, item.status.as_str()))
        .collect();
    tuples.sort();
    let digest = Sha256::digest(tuples.join("|").as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute the deterministic version of the current taxonomy content.
pub fn compute_version(taxonomy: &Taxonomy) -> TaxonomyVersion {
    let keywords_hash = category_hash(&taxonomy.keywords);
    let problems_hash = category_hash(&taxonomy.problems);
    let departments_hash = category_hash(&taxonomy.departments);

    let combined = format!("{keywords_hash}-{problems_hash}-{departments_hash}");
    let digest = Sha256::digest(combined.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let version = u64::from_be_bytes(bytes);

    TaxonomyVersion {
        version,
        keywords_hash,
        problems_hash,
        departments_hash,
        keywords_count: taxonomy.keywords.len(),
        problems_count: taxonomy.problems.len(),
        departments_count: taxonomy.departments.len(),
        updated_at_ms: now_ms(),
    }
}

/// Detects taxonomy drift and decides whether cached embeddings are
/// stale, against a pluggable [`VersionStore`].
pub struct VersionTracker {
    store: Arc<dyn VersionStore>,
}

impl VersionTracker {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    /// Compare the current taxonomy against the persisted baseline.
    ///
    /// Absent baseline yields a first-run report recommending embedding
    /// generation, unless the store already records embeddings for this
    /// exact content version.
    pub async fn detect_changes(&self, taxonomy: &Taxonomy) -> Result<ChangeReport> {
        let current = compute_version(taxonomy);
        let stored = self.store.load().await?.unwrap_or_default();

        let Some(previous) = stored.version_info else {
            let embeddings_current = stored.embeddings_version == Some(current.version);
            log::info!(
                "No taxonomy baseline found (version {}, embeddings current: {})",
                current.version,
                embeddings_current
            );
            let first_run_delta = |count: usize| CategoryDelta {
                added: if embeddings_current { 0 } else { count },
                removed: 0,
                modified: 0,
            };
            return Ok(ChangeReport {
                has_changes: !embeddings_current,
                keywords: first_run_delta(current.keywords_count),
                problems: first_run_delta(current.problems_count),
                departments: first_run_delta(current.departments_count),
                embeddings_outdated: !embeddings_current,
                recommend_regeneration: !embeddings_current,
                last_embeddings_version: stored.embeddings_version,
                current_version: current.version,
            });
        };

        let keywords = Self::category_delta(
            previous.keywords_count,
            current.keywords_count,
            previous.keywords_hash != current.keywords_hash,
        );
        let problems = Self::category_delta(
            previous.problems_count,
            current.problems_count,
            previous.problems_hash != current.problems_hash,
        );
        let departments = Self::category_delta(
            previous.departments_count,
            current.departments_count,
            previous.departments_hash != current.departments_hash,
        );

        let has_changes = keywords.modified > 0
            || problems.modified > 0
            || departments.modified > 0
            || keywords.added + keywords.removed > 0
            || problems.added + problems.removed > 0
            || departments.added + departments.removed > 0;

        let embeddings_outdated = has_changes
            || stored
                .embeddings_version
                .map_or(true, |v| v != current.version);

        let report = ChangeReport {
            has_changes,
            keywords,
            problems,
            departments,
            embeddings_outdated,
            recommend_regeneration: embeddings_outdated,
            last_embeddings_version: stored.embeddings_version,
            current_version: current.version,
        };

        log::debug!(
            "Taxonomy change detection: {} changes, embeddings_outdated={}",
            report.total_changes(),
            report.embeddings_outdated
        );
        Ok(report)
    }

    fn category_delta(previous: usize, current: usize, hash_changed: bool) -> CategoryDelta {
        CategoryDelta {
            added: current.saturating_sub(previous),
            removed: previous.saturating_sub(current),
            modified: usize::from(hash_changed),
        }
    }

    /// Persist the current content version as the new baseline.
    pub async fn persist_version(&self, taxonomy: &Taxonomy) -> Result<TaxonomyVersion> {
        let version = compute_version(taxonomy);
        let mut stored = self.store.load().await?.unwrap_or_default();
        stored.version_info = Some(version.clone());
        self.store.save(&stored).await?;
        log::info!("Taxonomy baseline persisted: version {}", version.version);
        Ok(version)
    }

    /// Record that embeddings were regenerated for `version`. Kept as a
    /// separate write so regeneration completion is tracked on its own.
    pub async fn mark_embeddings_updated(&self, version: u64) -> Result<()> {
        let mut stored = self.store.load().await?.unwrap_or_default();
        stored.embeddings_version = Some(version);
        stored.embeddings_updated_at_ms = Some(now_ms());
        self.store.save(&stored).await?;
        log::info!("Embeddings marked updated for taxonomy version {version}");
        Ok(())
    }

    /// Quick staleness check consumed by the pipeline before candidate
    /// search.
    pub async fn check_status(&self, taxonomy: &Taxonomy) -> Result<EmbeddingsStatus> {
        let stored = self.store.load().await?.unwrap_or_default();
        if stored.embeddings_version.is_none() {
            return Ok(EmbeddingsStatus::Missing);
        }
        let report = self.detect_changes(taxonomy).await?;
        if report.recommend_regeneration {
            Ok(EmbeddingsStatus::Outdated)
        } else {
            Ok(EmbeddingsStatus::UpToDate)
        }
    }
}

impl std::fmt::Debug for VersionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionTracker").finish_non_exhaustive()
    }
}
