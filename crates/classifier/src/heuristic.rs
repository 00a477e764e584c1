use crate::result::{
    ClassificationIssue, ClassificationResult, MatchStrategy, SuggestionType, Tier,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;

static RATING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([1-5])\b").unwrap());

const NEGATIVE_WORDS: &[&str] = &[
    "ruim", "péssimo", "péssima", "horrível", "sujo", "suja", "frio", "fria", "demorou",
    "demora", "demorado", "quebrado", "quebrada", "barulho", "ruído", "problema", "lento",
    "lenta", "nunca", "decepção", "decepcionante",
];

const POSITIVE_WORDS: &[&str] = &[
    "ótimo", "ótima", "excelente", "maravilhoso", "maravilhosa", "perfeito", "perfeita",
    "adorei", "amei", "bom", "boa", "incrível", "agradável",
];

const SUGGESTION_WORDS: &[&str] = &["deveria", "poderia", "sugiro", "recomendo", "seria bom"];

/// Department inference vocabularies. First context whose terms appear
/// in the text wins; order encodes specificity.
const DOMAIN_CONTEXTS: &[(&str, &[&str])] = &[
    ("A&B", &[
        "comida", "restaurante", "garçom", "garçonete", "café da manhã", "refeição", "jantar",
        "almoço", "bar", "bebida",
    ]),
    ("Governança", &[
        "quarto", "cama", "banheiro", "limpeza", "toalha", "lençol", "travesseiro",
    ]),
    ("Recepção", &[
        "recepção", "check-in", "check-out", "checkin", "checkout", "atendente", "reserva",
    ]),
    ("Tecnologia", &["wifi", "wi-fi", "internet", "tv", "televisão"]),
];

const DEFAULT_DEPARTMENT: &str = "Operações";

/// Problem vocabularies applied only to negative text.
const PROBLEM_RULES: &[(&[&str], &str)] = &[
    (&["demora", "demorou", "demorado", "lento", "lenta"], "Demora no Atendimento"),
    (&["sujo", "suja", "limpeza", "limpo", "limpa"], "Falta de Limpeza"),
    (&["frio", "fria"], "Qualidade da Refeição Abaixo do Esperado"),
    (&["barulho", "ruído", "barulhento"], "Ruído Excessivo"),
];

const FALLBACK_PROBLEM: &str = "Requer Análise Manual";

/// Last dependency-free tier before the emergency record: rule-based
/// scoring over fixed Portuguese vocabularies. Never fails.
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    /// `rating` is the guest's explicit star rating when the channel
    /// provides one; it outranks lexical sentiment scoring.
    pub fn classify(
        &self,
        text: &str,
        rating: Option<u8>,
        taxonomy_version: u64,
    ) -> ClassificationResult {
        let started = Instant::now();
        let lowered = text.to_lowercase();

        let (sentiment, confidence) = Self::score_sentiment(&lowered, rating);
        let department = Self::infer_department(&lowered);

        let mut issues = Vec::new();
        if sentiment <= 2 {
            issues.push(ClassificationIssue {
                department_id: "EMPTY".to_string(),
                keyword_id: "EMPTY".to_string(),
                problem_id: "EMPTY".to_string(),
                department_label: department.to_string(),
                keyword_label: format!("{department} - Geral"),
                problem_label: Self::infer_problem(&lowered).to_string(),
                detail: String::new(),
                confidence,
                matched_by: MatchStrategy::Heuristic,
            });
        }

        let has_suggestion = SUGGESTION_WORDS.iter().any(|w| lowered.contains(w));

        ClassificationResult {
            sentiment,
            has_suggestion,
            suggestion_type: if has_suggestion {
                SuggestionType::ImprovementOnly
            } else {
                SuggestionType::None
            },
            suggestion_summary: String::new(),
            issues,
            confidence,
            needs_review: true,
            tier_used: Tier::Heuristic,
            taxonomy_version,
            processing_time_ms: started.elapsed().as_millis() as u64,
            reasoning: None,
        }
    }

    fn score_sentiment(lowered: &str, rating: Option<u8>) -> (u8, f32) {
        if let Some(rating) = rating.filter(|r| (1..=5).contains(r)) {
            return (rating, 0.6);
        }
        if let Some(found) = RATING_RE
            .captures(lowered)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok())
        {
            return (found, 0.6);
        }

        let negatives = NEGATIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        let positives = POSITIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
        if positives > negatives {
            (4, 0.5)
        } else if negatives > positives {
            (2, 0.5)
        } else {
            (3, 0.3)
        }
    }

    fn infer_department(lowered: &str) -> &'static str {
        for (department, terms) in DOMAIN_CONTEXTS.iter().copied() {
            if terms.iter().any(|t| lowered.contains(t)) {
                return department;
            }
        }
        DEFAULT_DEPARTMENT
    }

    fn infer_problem(lowered: &str) -> &'static str {
        for (terms, problem) in PROBLEM_RULES.iter().copied() {
            if terms.iter().any(|t| lowered.contains(t)) {
                return problem;
            }
        }
        FALLBACK_PROBLEM
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}
