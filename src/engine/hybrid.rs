//! Ranking fusion for hybrid lexical + semantic search.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Ranked list of `(hash, score)` pairs, best first.
pub type Ranking = Vec<(String, f32)>;

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON { 0.0 } else { dot / denom }
}

fn sort_ranking(mut combined: Vec<(String, f32, usize)>) -> Ranking {
    // Ties fall back to the best rank seen in any input list, then the key.
    combined.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });
    combined.into_iter().map(|(key, score, _)| (key, score)).collect()
}

/// Reciprocal Rank Fusion: each list contributes `1 / (k + rank)` with 1-based ranks.
#[must_use]
pub fn reciprocal_rank_fusion(lists: &[&Ranking], k: f32) -> Ranking {
    let mut fused: HashMap<&str, (f32, usize)> = HashMap::new();
    for list in lists {
        for (idx, (key, _)) in list.iter().enumerate() {
            let rank = idx + 1;
            let contribution = 1.0 / (k + rank as f32);
            let entry = fused.entry(key.as_str()).or_insert((0.0, rank));
            entry.0 += contribution;
            entry.1 = entry.1.min(rank);
        }
    }
    sort_ranking(
        fused
            .into_iter()
            .map(|(key, (score, rank))| (key.to_string(), score, rank))
            .collect(),
    )
}

fn normalize(list: &Ranking) -> HashMap<&str, (f32, usize)> {
    let max = list.iter().map(|(_, score)| *score).fold(0.0f32, f32::max);
    list.iter()
        .enumerate()
        .map(|(idx, (key, score))| {
            let normalized = if max > f32::EPSILON { score / max } else { 0.0 };
            (key.as_str(), (normalized, idx + 1))
        })
        .collect()
}

/// Linear blend of max-normalized scores: `w * semantic + (1 - w) * lexical`.
#[must_use]
pub fn weighted_merge(semantic: &Ranking, lexical: &Ranking, semantic_weight: f32) -> Ranking {
    let semantic = normalize(semantic);
    let lexical = normalize(lexical);
    let mut merged: HashMap<&str, (f32, usize)> = HashMap::new();

    for (weight, list) in [(semantic_weight, &semantic), (1.0 - semantic_weight, &lexical)] {
        for (key, (score, rank)) in list {
            let entry = merged.entry(*key).or_insert((0.0, *rank));
            entry.0 += weight * score;
            entry.1 = entry.1.min(*rank);
        }
    }

    sort_ranking(
        merged
            .into_iter()
            .map(|(key, (score, rank))| (key.to_string(), score, rank))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{RRF_K, SEMANTIC_WEIGHT};

    fn ranking(keys: &[(&str, f32)]) -> Ranking {
        keys.iter().map(|(k, s)| ((*k).to_string(), *s)).collect()
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rrf_rewards_agreement() {
        let lexical = ranking(&[("a", 9.0), ("b", 5.0), ("c", 1.0)]);
        let semantic = ranking(&[("b", 0.9), ("c", 0.8), ("a", 0.1)]);
        let fused = reciprocal_rank_fusion(&[&lexical, &semantic], RRF_K);
        assert_eq!(fused[0].0, "b");
        assert_eq!(fused.len(), 3);
        let expected = 1.0 / (RRF_K + 2.0) + 1.0 / (RRF_K + 1.0);
        assert!((fused[0].1 - expected).abs() < 1e-6);
    }

    #[test]
    fn weighted_merge_prefers_semantic_weight() {
        let lexical = ranking(&[("a", 10.0), ("b", 1.0)]);
        let semantic = ranking(&[("b", 1.0), ("a", 0.5)]);
        let merged = weighted_merge(&semantic, &lexical, SEMANTIC_WEIGHT);
        assert_eq!(merged[0].0, "b");
        assert_eq!(merged[1].0, "a");
    }

    #[test]
    fn single_sided_results_survive() {
        let lexical = ranking(&[("only-lex", 2.0)]);
        let merged = weighted_merge(&Vec::new(), &lexical, SEMANTIC_WEIGHT);
        assert_eq!(merged, ranking(&[("only-lex", 1.0 - SEMANTIC_WEIGHT)]));
    }
}
