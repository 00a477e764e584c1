use crate::config::PipelineConfig;
use feedback_classifier::{CandidateRef, CandidateSet};
use feedback_embeddings::{similarity, EmbeddingCache, Result as EmbeddingResult};
use feedback_taxonomy::{compute_version, Taxonomy, TaxonomyItem, TextEnricher};

struct Row {
    item: TaxonomyItem,
    vector: Vec<f32>,
}

/// Embedded view of the active taxonomy.
///
/// Built once per taxonomy version: every active keyword and problem
/// label is enriched, embedded through the cache and held alongside
/// its vector. Departments are few enough to always pass through
/// unranked.
pub struct CandidateIndex {
    keywords: Vec<Row>,
    problems: Vec<Row>,
    departments: Vec<TaxonomyItem>,
    version: u64,
}

impl CandidateIndex {
    pub async fn build(
        taxonomy: &Taxonomy,
        cache: &EmbeddingCache,
        enricher: &dyn TextEnricher,
    ) -> EmbeddingResult<Self> {
        let keywords: Vec<TaxonomyItem> = taxonomy.active_keywords().cloned().collect();
        let problems: Vec<TaxonomyItem> = taxonomy.active_problems().cloned().collect();
        let departments: Vec<TaxonomyItem> = taxonomy.active_departments().cloned().collect();

        let keyword_rows = Self::embed_items(keywords, cache, enricher).await?;
        let problem_rows = Self::embed_items(problems, cache, enricher).await?;
        let version = compute_version(taxonomy).version;

        log::info!(
            "Candidate index built: {} keywords, {} problems, {} departments (version {version})",
            keyword_rows.len(),
            problem_rows.len(),
            departments.len(),
        );

        Ok(Self {
            keywords: keyword_rows,
            problems: problem_rows,
            departments,
            version,
        })
    }

    async fn embed_items(
        items: Vec<TaxonomyItem>,
        cache: &EmbeddingCache,
        enricher: &dyn TextEnricher,
    ) -> EmbeddingResult<Vec<Row>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let enriched: Vec<String> = items.iter().map(|i| enricher.enrich(&i.label)).collect();
        let vectors = cache.batch_get_or_create(&enriched).await?;
        Ok(items
            .into_iter()
            .zip(vectors)
            .map(|(item, vector)| Row {
                item,
                vector: vector.as_ref().clone(),
            })
            .collect())
    }

    /// Rank candidates for one feedback text. Keywords and problems
    /// are filtered by their similarity floors and capped; departments
    /// always ship in full so the provider can place an issue even
    /// when nothing ranked.
    pub async fn search(
        &self,
        text: &str,
        cache: &EmbeddingCache,
        config: &PipelineConfig,
    ) -> EmbeddingResult<CandidateSet> {
        let query = cache.get_or_create(text).await?;

        let keywords = Self::rank(
            &query,
            &self.keywords,
            config.max_candidates,
            config.keyword_min_score,
        );
        let problems = Self::rank(
            &query,
            &self.problems,
            config.max_candidates,
            config.problem_min_score,
        );
        let departments = self
            .departments
            .iter()
            .map(|item| Self::to_ref(item, 1.0))
            .collect();

        Ok(CandidateSet {
            departments,
            keywords,
            problems,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.problems.is_empty()
    }

    fn rank(query: &[f32], rows: &[Row], k: usize, min_score: f32) -> Vec<CandidateRef> {
        let vectors: Vec<Vec<f32>> = rows.iter().map(|r| r.vector.clone()).collect();
        similarity::top_k(query, &vectors, k, min_score)
            .into_iter()
            .map(|scored| Self::to_ref(&rows[scored.index].item, scored.score))
            .collect()
    }

    fn to_ref(item: &TaxonomyItem, score: f32) -> CandidateRef {
        CandidateRef {
            id: item.id.clone(),
            label: item.label.clone(),
            department_id: item.department_id.clone(),
            score,
            description: item.description.clone(),
            examples: item.examples.clone(),
        }
    }
}
