use serde::{Deserialize, Serialize};

/// Stage of the fallback chain that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Textual,
    Heuristic,
    Emergency,
}

impl Tier {
    /// Next stage after a tier failure. Emergency is terminal.
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Primary => Some(Tier::Textual),
            Tier::Textual => Some(Tier::Heuristic),
            Tier::Heuristic => Some(Tier::Emergency),
            Tier::Emergency => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::Textual => "textual",
            Tier::Heuristic => "heuristic",
            Tier::Emergency => "emergency",
        }
    }
}

/// How an issue's keyword/problem was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Embedding,
    Proposed,
    TextSearch,
    Heuristic,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    #[default]
    None,
    ImprovementOnly,
    ImprovementWithCriticism,
    ImprovementWithPraise,
    MixedFeedback,
}

/// One identified aspect of a feedback item. A classification carries
/// at most three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationIssue {
    pub department_id: String,
    pub keyword_id: String,
    pub problem_id: String,
    pub department_label: String,
    pub keyword_label: String,
    pub problem_label: String,
    /// Free-text description, at most 120 chars.
    pub detail: String,
    pub confidence: f32,
    pub matched_by: MatchStrategy,
}

impl ClassificationIssue {
    pub fn has_problem(&self) -> bool {
        !is_empty_label(&self.problem_label)
    }

    pub fn has_department(&self) -> bool {
        !is_empty_label(&self.department_label)
    }
}

/// Pipeline output before consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 1 = very unsatisfied .. 5 = very satisfied.
    pub sentiment: u8,
    pub has_suggestion: bool,
    pub suggestion_type: SuggestionType,
    /// At most 200 chars; empty when `has_suggestion` is false.
    pub suggestion_summary: String,
    pub issues: Vec<ClassificationIssue>,
    pub confidence: f32,
    pub needs_review: bool,
    pub tier_used: Tier,
    pub taxonomy_version: u64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ClassificationResult {
    /// Neutral low-confidence result for empty or too-short input.
    pub fn neutral(taxonomy_version: u64, tier: Tier) -> Self {
        Self {
            sentiment: 3,
            has_suggestion: false,
            suggestion_type: SuggestionType::None,
            suggestion_summary: String::new(),
            issues: Vec::new(),
            confidence: 0.3,
            needs_review: true,
            tier_used: tier,
            taxonomy_version,
            processing_time_ms: 0,
            reasoning: None,
        }
    }
}

/// Sentinel labels the original system used for "nothing here"; none
/// of them may surface in consolidated output.
pub fn is_empty_label(label: &str) -> bool {
    let trimmed = label.trim();
    trimmed.is_empty()
        || trimmed == "VAZIO"
        || trimmed == "EMPTY"
        || trimmed == "Não identificado"
}

pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Coerce a raw sentiment into 1..=5. Returns the coerced value and
/// whether coercion happened (out-of-range forces review).
pub fn coerce_sentiment(raw: i64) -> (u8, bool) {
    if (1..=5).contains(&raw) {
        (raw as u8, false)
    } else {
        (3, true)
    }
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
