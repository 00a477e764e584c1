use crate::error::{ClassifyError, Result};
use crate::result::{
    ClassificationIssue, ClassificationResult, MatchStrategy, SuggestionType, Tier,
};
use feedback_taxonomy::{Taxonomy, TaxonomyItem};
use std::time::Instant;
use unicode_segmentation::UnicodeSegmentation;

/// Words shorter than this carry no signal for label matching.
const MIN_MATCH_WORD_LEN: usize = 3;

const NEGATIVE_WORDS: &[&str] = &[
    "fria", "frio", "demorou", "demora", "demorado", "ruim", "péssimo", "péssima", "horrível",
    "sujo", "suja", "lento", "lenta", "problema", "quebrado", "quebrada", "barulho", "reclamação",
];

const POSITIVE_WORDS: &[&str] = &[
    "excelente", "ótimo", "ótima", "maravilhoso", "maravilhosa", "perfeito", "perfeita",
    "adorei", "amei", "incrível",
];

/// Second tier: lexical matching of taxonomy labels and aliases
/// directly against the feedback text. No external calls, so the only
/// failure mode is an unusable taxonomy.
pub struct TextualMatcher;

impl TextualMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        taxonomy_version: u64,
    ) -> Result<ClassificationResult> {
        if taxonomy.keywords.is_empty() && taxonomy.problems.is_empty() {
            return Err(ClassifyError::InvalidRequest(
                "taxonomy has no keywords or problems to match against".to_string(),
            ));
        }

        let started = Instant::now();
        let lowered = text.to_lowercase();

        let matched_keyword = taxonomy
            .active_keywords()
            .find(|item| Self::item_matches(item, &lowered));
        let matched_problem = taxonomy
            .active_problems()
            .find(|item| Self::item_matches(item, &lowered));

        let sentiment = Self::scan_sentiment(&lowered);
        let confidence = if matched_keyword.is_some() && matched_problem.is_some() {
            0.7
        } else {
            0.5
        };

        let mut issues = Vec::new();
        if matched_keyword.is_some() || matched_problem.is_some() || sentiment <= 2 {
            let department_label = matched_keyword
                .and_then(|k| k.department_id.as_deref())
                .and_then(|id| taxonomy.department_by_id(id))
                .map(|d| d.label.clone())
                .unwrap_or_else(|| "Operações".to_string());

            let problem_label = match matched_problem {
                Some(problem) => problem.label.clone(),
                // Only force a generic problem on clearly negative text.
                None if sentiment <= 2 => "Problema no Atendimento".to_string(),
                None => String::new(),
            };

            issues.push(ClassificationIssue {
                department_id: matched_keyword
                    .and_then(|k| k.department_id.clone())
                    .unwrap_or_else(|| "EMPTY".to_string()),
                keyword_id: matched_keyword
                    .map(|k| k.id.clone())
                    .unwrap_or_else(|| "EMPTY".to_string()),
                problem_id: matched_problem
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| "EMPTY".to_string()),
                department_label,
                keyword_label: matched_keyword.map(|k| k.label.clone()).unwrap_or_default(),
                problem_label,
                detail: String::new(),
                confidence,
                matched_by: MatchStrategy::TextSearch,
            });
        }

        let needs_review = confidence < 0.6 || issues.is_empty();

        Ok(ClassificationResult {
            sentiment,
            has_suggestion: false,
            suggestion_type: SuggestionType::None,
            suggestion_summary: String::new(),
            issues,
            confidence,
            needs_review,
            tier_used: Tier::Textual,
            taxonomy_version,
            processing_time_ms: started.elapsed().as_millis() as u64,
            reasoning: None,
        })
    }

    /// A label or alias matches when any of its significant words
    /// appears in the text.
    fn item_matches(item: &TaxonomyItem, lowered_text: &str) -> bool {
        let mut sources = vec![item.label.as_str()];
        sources.extend(item.aliases.iter().map(String::as_str));
        sources.iter().any(|source| {
            source
                .to_lowercase()
                .unicode_words()
                .filter(|word| word.chars().count() >= MIN_MATCH_WORD_LEN)
                .any(|word| lowered_text.contains(word))
        })
    }

    fn scan_sentiment(lowered_text: &str) -> u8 {
        if NEGATIVE_WORDS.iter().any(|w| lowered_text.contains(w)) {
            2
        } else if POSITIVE_WORDS.iter().any(|w| lowered_text.contains(w)) {
            4
        } else {
            3
        }
    }
}

impl Default for TextualMatcher {
    fn default() -> Self {
        Self::new()
    }
}
