use feedback_classifier::{
    clamp_confidence, coerce_sentiment, is_empty_label, ClassificationIssue, ClassificationResult,
    SuggestionType, Tier,
};
use serde::{Deserialize, Serialize};

/// Review threshold on the consolidated confidence.
const REVIEW_CONFIDENCE: f32 = 0.6;

/// Flat record shaped for the downstream store: one row per feedback
/// item, multi-valued columns joined into capped display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    /// 1..=5, coerced when the upstream sentiment was out of range.
    pub rating: u8,
    pub keywords: String,
    pub sectors: String,
    pub problems: String,
    pub compliments: String,
    pub has_suggestion: bool,
    pub suggestion_type: SuggestionType,
    pub suggestion_summary: String,
    pub confidence: f32,
    pub needs_review: bool,
    pub tier_used: Tier,
    pub taxonomy_version: u64,
    /// Full per-issue detail, preserved for drill-down.
    pub all_issues: Vec<ClassificationIssue>,
}

/// Flatten a classification into the storage shape.
///
/// Per issue: a compliment when the sentiment is positive and the
/// issue names no problem, or neutral with neither problem nor
/// department; anything else is a problem. Negative sentiment is
/// always a problem.
pub fn consolidate(result: &ClassificationResult) -> ConsolidatedRecord {
    let (rating, coerced) = coerce_sentiment(result.sentiment as i64);

    let mut keywords = Vec::new();
    let mut sectors = Vec::new();
    let mut problems = Vec::new();
    let mut compliments = Vec::new();

    for issue in &result.issues {
        if is_compliment(rating, issue) {
            let text = if is_empty_label(&issue.keyword_label) {
                issue.detail.trim().to_string()
            } else {
                issue.keyword_label.trim().to_string()
            };
            if !text.is_empty() {
                compliments.push(text);
            }
        } else {
            push_label(&mut keywords, &issue.keyword_label);
            push_label(&mut sectors, &issue.department_label);
            push_label(&mut problems, &issue.problem_label);
        }
    }

    dedup_sorted(&mut keywords);
    dedup_sorted(&mut sectors);
    dedup_sorted(&mut problems);
    dedup_sorted(&mut compliments);

    let confidence = if result.issues.is_empty() {
        clamp_confidence(result.confidence)
    } else {
        clamp_confidence(
            result.issues.iter().map(|i| i.confidence).sum::<f32>() / result.issues.len() as f32,
        )
    };
    let needs_review = result.needs_review || coerced || confidence < REVIEW_CONFIDENCE;

    ConsolidatedRecord {
        rating,
        keywords: join_capped(&keywords, ";", 3, 2),
        sectors: join_capped(&sectors, ";", 2, 1),
        problems: join_capped(&problems, ";", 2, 2),
        compliments: join_capped(&compliments, "; ", 2, 2),
        has_suggestion: result.has_suggestion,
        suggestion_type: result.suggestion_type,
        suggestion_summary: result.suggestion_summary.clone(),
        confidence,
        needs_review,
        tier_used: result.tier_used,
        taxonomy_version: result.taxonomy_version,
        all_issues: result.issues.clone(),
    }
}

fn is_compliment(rating: u8, issue: &ClassificationIssue) -> bool {
    if rating <= 2 {
        return false;
    }
    let no_problem = !issue.has_problem();
    match rating {
        4 | 5 => no_problem,
        3 => no_problem && !issue.has_department(),
        _ => false,
    }
}

fn push_label(into: &mut Vec<String>, label: &str) {
    if !is_empty_label(label) {
        into.push(label.trim().to_string());
    }
}

fn dedup_sorted(values: &mut Vec<String>) {
    values.sort();
    values.dedup();
}

/// Join up to `max` values with `sep`; beyond that, keep the first
/// `shown` and summarize the rest as `+N outros`.
fn join_capped(values: &[String], sep: &str, max: usize, shown: usize) -> String {
    if values.len() <= max {
        return values.join(sep);
    }
    let mut parts: Vec<&str> = values.iter().take(shown).map(String::as_str).collect();
    let overflow = format!("+{} outros", values.len() - shown);
    parts.push(&overflow);
    parts.join(sep)
}
