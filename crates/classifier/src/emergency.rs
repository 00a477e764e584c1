use crate::result::{
    truncate_chars, ClassificationIssue, ClassificationResult, MatchStrategy, SuggestionType, Tier,
};

const TEXT_SNIPPET_CHARS: usize = 50;

/// Terminal fallback: every exhausted chain still yields a persistable
/// record, flagged for manual review with zero confidence.
pub fn emergency_result(text: &str, reason: &str, taxonomy_version: u64) -> ClassificationResult {
    let snippet = truncate_chars(text.trim(), TEXT_SNIPPET_CHARS);
    let detail = format!("Erro: {reason}. Texto: {snippet}...");

    ClassificationResult {
        sentiment: 3,
        has_suggestion: false,
        suggestion_type: SuggestionType::None,
        suggestion_summary: String::new(),
        issues: vec![ClassificationIssue {
            department_id: "EMPTY".to_string(),
            keyword_id: "EMPTY".to_string(),
            problem_id: "EMPTY".to_string(),
            department_label: "Sistema".to_string(),
            keyword_label: "Erro de Processamento".to_string(),
            problem_label: "Falha na Análise - Requer Revisão Manual".to_string(),
            detail: truncate_chars(&detail, 120),
            confidence: 0.0,
            matched_by: MatchStrategy::Emergency,
        }],
        confidence: 0.0,
        needs_review: true,
        tier_used: Tier::Emergency,
        taxonomy_version,
        processing_time_ms: 0,
        reasoning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emergency_record_is_flagged_for_review() {
        let result = emergency_result("feedback qualquer", "timeout", 9);
        assert_eq!(result.confidence, 0.0);
        assert!(result.needs_review);
        assert_eq!(result.tier_used, Tier::Emergency);
        assert_eq!(result.taxonomy_version, 9);

        let issue = &result.issues[0];
        assert_eq!(issue.keyword_label, "Erro de Processamento");
        assert_eq!(issue.department_label, "Sistema");
        assert_eq!(
            issue.problem_label,
            "Falha na Análise - Requer Revisão Manual"
        );
        assert!(issue.detail.contains("timeout"));
        assert!(issue.detail.contains("feedback qualquer"));
    }

    #[test]
    fn long_text_is_truncated_in_detail() {
        let long = "a".repeat(300);
        let result = emergency_result(&long, "falha", 1);
        assert!(result.issues[0].detail.chars().count() <= 120);
    }
}
