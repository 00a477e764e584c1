use crate::error::Result;
use crate::provider::ClassificationProvider;
use crate::result::{
    clamp_confidence, truncate_chars, ClassificationIssue, ClassificationResult, MatchStrategy,
    SuggestionType, Tier,
};
use crate::schema::{CandidateSet, ClassificationRequest, RawClassification, RawIssue};
use std::sync::Arc;
use std::time::Instant;

const MAX_ISSUES: usize = 3;
const MAX_DETAIL_CHARS: usize = 120;
const MAX_SUMMARY_CHARS: usize = 200;

/// Similarity above which a candidate match counts as exact rather
/// than embedding-based.
const EXACT_MATCH_SCORE: f32 = 0.9;

/// First tier: structured generation against an external service,
/// validated post-hoc against the declared schema.
pub struct PrimaryClassifier {
    provider: Arc<dyn ClassificationProvider>,
    min_text_len: usize,
}

impl PrimaryClassifier {
    pub fn new(provider: Arc<dyn ClassificationProvider>) -> Self {
        Self {
            provider,
            min_text_len: 3,
        }
    }

    pub fn with_min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    /// Classify `text` against a candidate subset.
    ///
    /// Empty or too-short input short-circuits to a neutral
    /// low-confidence result without a provider call. A response that
    /// fails validation is a tier failure, never silently accepted.
    pub async fn classify(
        &self,
        text: &str,
        candidates: &CandidateSet,
        taxonomy_version: u64,
    ) -> Result<ClassificationResult> {
        let started = Instant::now();
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_text_len {
            log::debug!("Input too short ({} chars), short-circuiting", trimmed.len());
            return Ok(ClassificationResult::neutral(taxonomy_version, Tier::Primary));
        }

        let request = ClassificationRequest::new(trimmed, candidates.clone());
        let raw = self.provider.classify(&request).await?;
        raw.validate(MAX_ISSUES)?;

        Ok(self.resolve(raw, candidates, taxonomy_version, started))
    }

    /// Resolve raw provider issues against the candidate set and build
    /// the typed result.
    fn resolve(
        &self,
        raw: RawClassification,
        candidates: &CandidateSet,
        taxonomy_version: u64,
        started: Instant,
    ) -> ClassificationResult {
        let mut issues = Vec::with_capacity(raw.issues.len());
        for raw_issue in &raw.issues {
            if let Some(issue) = Self::resolve_issue(raw_issue, &raw, candidates) {
                issues.push(issue);
            }
        }

        let confidence = clamp_confidence(raw.confidence);
        let needs_review = confidence < 0.5 || issues.is_empty();

        ClassificationResult {
            sentiment: raw.sentiment as u8,
            has_suggestion: raw.has_suggestion,
            suggestion_type: if raw.has_suggestion {
                raw.suggestion_type
            } else {
                SuggestionType::None
            },
            suggestion_summary: truncate_chars(&raw.suggestion_summary, MAX_SUMMARY_CHARS),
            issues,
            confidence,
            needs_review,
            tier_used: Tier::Primary,
            taxonomy_version,
            processing_time_ms: started.elapsed().as_millis() as u64,
            reasoning: raw.reasoning,
        }
    }

    fn resolve_issue(
        raw_issue: &RawIssue,
        raw: &RawClassification,
        candidates: &CandidateSet,
    ) -> Option<ClassificationIssue> {
        let department = candidates.department(&raw_issue.department_id);
        if department.is_none() && raw_issue.department_id != "EMPTY" {
            log::warn!(
                "Provider returned unknown department id '{}', dropping issue",
                raw_issue.department_id
            );
            return None;
        }

        let keyword = candidates.keyword(&raw_issue.keyword_id);
        let problem = candidates.problem(&raw_issue.problem_id);

        // Keyword resolution cascade: candidate match, issue-specific
        // proposal, global proposal, department-generic fallback.
        let (keyword_label, matched_by) = if let Some(keyword) = keyword {
            let strategy = if keyword.score > EXACT_MATCH_SCORE {
                MatchStrategy::Exact
            } else {
                MatchStrategy::Embedding
            };
            (keyword.label.clone(), strategy)
        } else if let Some(proposed) = &raw_issue.proposed_keyword {
            (proposed.clone(), MatchStrategy::Proposed)
        } else if let Some(proposed) = &raw.proposed_keyword_label {
            (proposed.clone(), MatchStrategy::Proposed)
        } else if let Some(department) = department {
            (format!("{} - Geral", department.label), MatchStrategy::Proposed)
        } else {
            ("Não identificado".to_string(), MatchStrategy::Proposed)
        };

        Some(ClassificationIssue {
            department_id: raw_issue.department_id.clone(),
            keyword_id: if raw_issue.keyword_id.is_empty() {
                "EMPTY".to_string()
            } else {
                raw_issue.keyword_id.clone()
            },
            problem_id: if raw_issue.problem_id.is_empty() {
                "EMPTY".to_string()
            } else {
                raw_issue.problem_id.clone()
            },
            department_label: department
                .map(|d| d.label.clone())
                .unwrap_or_else(|| "Não identificado".to_string()),
            keyword_label,
            problem_label: problem.map(|p| p.label.clone()).unwrap_or_default(),
            detail: truncate_chars(&raw_issue.detail, MAX_DETAIL_CHARS),
            confidence: clamp_confidence(raw_issue.confidence),
            matched_by,
        })
    }
}
