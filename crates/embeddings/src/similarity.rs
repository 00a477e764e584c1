//! Cosine similarity and brute-force top-k ranking.
//!
//! Candidate sets are taxonomy-sized (hundreds, not millions), so a
//! linear scan beats any index here.

/// Cosine similarity of two vectors.
///
/// Mismatched dimensions or a zero-magnitude side yield 0.0 rather
/// than NaN, so degenerate vectors rank last instead of poisoning the
/// sort.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A scored candidate index into the caller's collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub score: f32,
}

/// Rank `candidates` against `query`, keeping the top `k` at or above
/// `min_score`, best first. Ties keep input order.
pub fn top_k(query: &[f32], candidates: &[Vec<f32>], k: usize, min_score: f32) -> Vec<Scored> {
    let mut scored: Vec<Scored> = candidates
        .iter()
        .enumerate()
        .map(|(index, vector)| Scored {
            index,
            score: cosine(query, vector),
        })
        .filter(|s| s.score >= min_score)
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
