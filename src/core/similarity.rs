use ndarray::ArrayView1;

use crate::models::catalog::CatalogItem;

/// Similarity cutoff used when none is configured.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Number of matches kept per suggestion when none is configured.
pub const DEFAULT_TOP_K: usize = 3;

/// A catalog item paired with the embedding of its description.
#[derive(Debug, Clone)]
pub struct EmbeddedItem {
    /// The catalog item
    pub item: CatalogItem,
    /// Embedding of `item.description`
    pub vector: Vec<f32>,
}

/// A candidate that cleared the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredIndex {
    /// Position of the candidate in the input slice
    pub index: usize,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Compute cosine similarity between two embeddings.
///
/// Returns `0.0` for zero vectors, mismatched lengths and non-finite results.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);

    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        let similarity = dot_product / (norm_a * norm_b);
        if similarity.is_finite() {
            return similarity.clamp(-1.0, 1.0);
        }
    }
    0.0
}

/// Score every candidate against `query`, keep those at or above
/// `threshold`, and return at most `top_k` of them, best first.
///
/// Equal scores keep their input order.
pub fn rank_scores(
    query: &[f32],
    candidates: &[EmbeddedItem],
    threshold: f32,
    top_k: usize,
) -> Vec<ScoredIndex> {
    let mut scored: Vec<ScoredIndex> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| ScoredIndex {
            index,
            score: cosine_similarity(query, &candidate.vector),
        })
        .filter(|scored| scored.score >= threshold)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}

/// Rank catalog items for one query vector.
///
/// The returned items have their embeddings stripped.
pub fn rank(
    query: &[f32],
    candidates: &[EmbeddedItem],
    threshold: f32,
    top_k: usize,
) -> Vec<CatalogItem> {
    rank_scores(query, candidates, threshold, top_k)
        .into_iter()
        .map(|scored| candidates[scored.index].item.without_embedding())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, vector: Vec<f32>) -> EmbeddedItem {
        EmbeddedItem {
            item: CatalogItem::new(id, id, "Tops", "Black", "Casual", "Unisex", id),
            vector,
        }
    }

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        // Test with identical vectors
        let a = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);

        // Test with orthogonal vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);

        // Test with opposite vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_is_symmetric() {
        let a = [0.2, 0.7, -0.1, 0.4];
        let b = [0.9, -0.3, 0.5, 0.05];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_degenerate_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_reference_scenario() {
        let candidates = vec![
            candidate("A", vec![1.0, 0.0]),
            candidate("B", vec![0.0, 1.0]),
            candidate("C", vec![0.9, 0.1]),
        ];
        let ranked = rank(&[1.0, 0.0], &candidates, 0.5, 2);
        assert_eq!(ids(&ranked), vec!["A", "C"]);
        assert!(ranked.iter().all(|item| item.embedding.is_none()));
    }

    #[test]
    fn test_rank_respects_top_k_and_threshold() {
        let candidates: Vec<EmbeddedItem> = (0..10)
            .map(|i| candidate(&i.to_string(), vec![1.0, i as f32 * 0.3]))
            .collect();
        let scored = rank_scores(&[1.0, 0.0], &candidates, 0.6, 4);

        assert!(scored.len() <= 4);
        assert!(scored.iter().all(|s| s.score >= 0.6));
        assert!(scored.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_ties_keep_catalog_order() {
        let candidates = vec![
            candidate("first", vec![2.0, 0.0]),
            candidate("second", vec![1.0, 0.0]),
            candidate("third", vec![0.5, 0.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &candidates, 0.5, 3);
        assert_eq!(ids(&ranked), vec!["first", "second", "third"]);

        // identical input, identical output
        assert_eq!(ranked, rank(&[1.0, 0.0], &candidates, 0.5, 3));
    }

    #[test]
    fn test_zero_vector_candidate_is_skipped_not_fatal() {
        let candidates = vec![candidate("zero", vec![0.0, 0.0]), candidate("x", vec![1.0, 0.0])];
        let scored = rank_scores(&[1.0, 0.0], &candidates, 0.0, 5);
        assert_eq!(scored[0].index, 1);
        assert_eq!(scored[1], ScoredIndex { index: 0, score: 0.0 });
    }

    #[test]
    fn test_nothing_above_threshold_is_empty() {
        let candidates = vec![candidate("B", vec![0.0, 1.0])];
        assert!(rank(&[1.0, 0.0], &candidates, DEFAULT_THRESHOLD, DEFAULT_TOP_K).is_empty());
    }
}
