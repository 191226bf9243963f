//! Candidate selection: plain top-k and Maximal Marginal Relevance.
//!
//! MMR = λ × rel(doc) - (1-λ) × max(sim(doc, selected))
//!
//! λ = 1.0 ranks purely by relevance, λ = 0.0 purely by novelty.

use crate::store::{EmbeddingMatrix, dot};

/// Default balance between relevance and novelty.
pub const DEFAULT_LAMBDA: f32 = 0.7;

/// Indices of the `limit` highest scores, best first. Ties keep insertion order
/// and NaN ranks last.
pub fn top_k(relevance: &[f32], limit: usize) -> Vec<usize> {
    let rank = |index: usize| {
        let score = relevance[index];
        if score.is_nan() { f32::NEG_INFINITY } else { score }
    };
    let mut indices: Vec<usize> = (0..relevance.len()).collect();
    // Stable sort, so equal scores stay in index order.
    indices.sort_by(|left, right| rank(*right).total_cmp(&rank(*left)));
    indices.truncate(limit);
    indices
}

/// Greedily pick `limit` rows of `matrix` balancing `relevance` against
/// similarity to rows already picked.
///
/// `relevance[i]` is the query similarity of row `i`. The first pick is the
/// most relevant row; ties go to the lower index.
pub fn mmr_select(
    matrix: &EmbeddingMatrix,
    relevance: &[f32],
    limit: usize,
    lambda: f32,
) -> Vec<usize> {
    let count = relevance.len().min(matrix.rows());
    if count == 0 || limit == 0 {
        return Vec::new();
    }

    let similarity = pairwise_similarity(matrix, count);
    let mut candidates: Vec<usize> = (0..count).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(limit.min(count));

    while selected.len() < limit && !candidates.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &candidate) in candidates.iter().enumerate() {
            let score = if selected.is_empty() {
                relevance[candidate]
            } else {
                let redundancy = selected
                    .iter()
                    .map(|&picked| similarity[candidate * count + picked])
                    .fold(f32::NEG_INFINITY, f32::max);
                lambda * relevance[candidate] - (1.0 - lambda) * redundancy
            };
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(candidates.remove(best_pos));
    }

    selected
}

/// Row-major `count × count` cosine similarities, clamped to [-1, 1].
fn pairwise_similarity(matrix: &EmbeddingMatrix, count: usize) -> Vec<f32> {
    let rows: Vec<&[f32]> = matrix.iter_rows().take(count).collect();
    let mut similarity = vec![0.0; count * count];
    for (row, left) in rows.iter().enumerate() {
        for (col, right) in rows.iter().enumerate().skip(row) {
            let value = dot(left, right).clamp(-1.0, 1.0);
            similarity[row * count + col] = value;
            similarity[col * count + row] = value;
        }
    }
    similarity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f32>>) -> EmbeddingMatrix {
        let dim = rows[0].len();
        let mut matrix = EmbeddingMatrix::from_rows(dim, rows).unwrap();
        matrix.normalize_rows();
        matrix
    }

    #[test]
    fn test_top_k_orders_by_score() {
        assert_eq!(top_k(&[0.1, 0.9, 0.5], 2), vec![1, 2]);
    }

    #[test]
    fn test_top_k_ties_keep_insertion_order() {
        assert_eq!(top_k(&[0.5, 0.7, 0.5, 0.7], 3), vec![1, 3, 0]);
    }

    #[test]
    fn test_top_k_ranks_nan_last() {
        assert_eq!(top_k(&[0.3, f32::NAN, 0.8], 2), vec![2, 0]);
    }

    #[test]
    fn test_top_k_larger_than_input() {
        assert_eq!(top_k(&[0.2, 0.3], 5), vec![1, 0]);
        assert!(top_k(&[], 3).is_empty());
    }

    #[test]
    fn test_mmr_skips_near_duplicates() {
        let rows = matrix(vec![
            vec![1.0, 0.0],
            vec![0.99, 0.01],
            vec![0.98, 0.02],
            vec![0.0, 1.0],
        ]);
        let query = [0.8f32, 0.6];
        let relevance = rows.dot(&query);

        let picked = mmr_select(&rows, &relevance, 2, DEFAULT_LAMBDA);
        assert_eq!(picked.len(), 2);
        assert!(picked[0] < 3);
        assert_eq!(picked[1], 3);

        let plain = top_k(&relevance, 2);
        assert!(plain.iter().all(|&index| index < 3));
    }

    #[test]
    fn test_mmr_first_pick_is_most_relevant() {
        let rows = matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]]);
        let relevance = vec![0.2, 0.8, 0.8];
        let picked = mmr_select(&rows, &relevance, 1, DEFAULT_LAMBDA);
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn test_mmr_with_full_relevance_matches_top_k() {
        let rows = matrix(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        let relevance = vec![0.9, 0.8, 0.3, 0.1];
        assert_eq!(mmr_select(&rows, &relevance, 3, 1.0), top_k(&relevance, 3));
    }

    #[test]
    fn test_mmr_exhausts_candidates() {
        let rows = matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let picked = mmr_select(&rows, &[0.4, 0.6], 5, DEFAULT_LAMBDA);
        assert_eq!(picked, vec![1, 0]);
    }
}
