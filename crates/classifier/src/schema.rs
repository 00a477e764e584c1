use crate::error::{ClassifyError, Result};
use crate::result::SuggestionType;
use serde::{Deserialize, Serialize};

/// One taxonomy candidate offered to the provider, with its
/// similarity score from candidate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub department_id: Option<String>,
    pub score: f32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl CandidateRef {
    pub fn new(id: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            department_id: None,
            score,
            description: None,
            examples: Vec::new(),
        }
    }
}

/// Constrained taxonomy subset sent to the structured-generation
/// service. The provider must answer with ids drawn from this set (or
/// propose new labels).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSet {
    pub departments: Vec<CandidateRef>,
    pub keywords: Vec<CandidateRef>,
    pub problems: Vec<CandidateRef>,
}

impl CandidateSet {
    pub fn department(&self, id: &str) -> Option<&CandidateRef> {
        self.departments.iter().find(|c| c.id == id)
    }

    pub fn keyword(&self, id: &str) -> Option<&CandidateRef> {
        self.keywords.iter().find(|c| c.id == id)
    }

    pub fn problem(&self, id: &str) -> Option<&CandidateRef> {
        self.problems.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.problems.is_empty()
    }
}

/// Request envelope for the classification provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub text: String,
    pub candidates: CandidateSet,
    pub max_issues: usize,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>, candidates: CandidateSet) -> Self {
        Self {
            text: text.into(),
            candidates,
            max_issues: 3,
        }
    }
}

/// Raw issue as returned by the provider, before resolution against
/// the candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub department_id: String,
    #[serde(default)]
    pub keyword_id: String,
    #[serde(default)]
    pub problem_id: String,
    #[serde(default)]
    pub detail: String,
    pub confidence: f32,
    #[serde(default)]
    pub proposed_keyword: Option<String>,
}

/// Dynamically-shaped provider response. Validated post-hoc: the
/// provider enforces the schema on its side, we double-check locally
/// and treat any violation as a tier failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClassification {
    pub sentiment: i64,
    #[serde(default)]
    pub has_suggestion: bool,
    #[serde(default)]
    pub suggestion_type: SuggestionType,
    #[serde(default)]
    pub suggestion_summary: String,
    pub confidence: f32,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub proposed_keyword_label: Option<String>,
    #[serde(default)]
    pub proposed_problem_label: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl RawClassification {
    /// Local schema check: sentiment must be an integer in 1..=5,
    /// at most `max_issues` issues, every confidence in [0,1].
    pub fn validate(&self, max_issues: usize) -> Result<()> {
        if !(1..=5).contains(&self.sentiment) {
            return Err(ClassifyError::SchemaViolation(format!(
                "sentiment {} outside 1..=5",
                self.sentiment
            )));
        }
        if self.issues.len() > max_issues {
            return Err(ClassifyError::SchemaViolation(format!(
                "{} issues exceed maximum of {max_issues}",
                self.issues.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            return Err(ClassifyError::SchemaViolation(format!(
                "overall confidence {} outside [0,1]",
                self.confidence
            )));
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if !(0.0..=1.0).contains(&issue.confidence) || issue.confidence.is_nan() {
                return Err(ClassifyError::SchemaViolation(format!(
                    "issue {i} confidence {} outside [0,1]",
                    issue.confidence
                )));
            }
        }
        Ok(())
    }
}
