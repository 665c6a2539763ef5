//! Embedding collaborator.
//!
//! The store only needs "text in, vector out" and a way to ask whether that is possible
//! right now. Callers on the write path degrade to storing rows without vectors when the
//! embedder is unavailable or fails.

use crate::constants::DEFAULT_EMBEDDING_DIMENSION;
use crate::engine::fulltext::tokenize;
use crate::error::{MembankError, Result};

pub trait Embedder: Send + Sync {
    /// Identifier recorded in logs.
    fn model(&self) -> &str;

    fn dimension(&self) -> usize;

    fn available(&self) -> bool;

    /// One vector per input text, by position.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Embed `texts` and check the collaborator returned exactly one vector per input.
pub fn embed_all(embedder: &dyn Embedder, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
    if !embedder.available() {
        return Err(MembankError::EmbeddingUnavailable {
            reason: format!("{} is not available", embedder.model()),
        });
    }
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(MembankError::EmbeddingUnavailable {
            reason: format!(
                "{} returned {} vectors for {} inputs",
                embedder.model(),
                vectors.len(),
                texts.len()
            ),
        });
    }
    Ok(vectors)
}

/// Deterministic feature-hashing embedder.
///
/// Each token is hashed with BLAKE3 into a signed bucket; the bag is L2-normalized. Texts
/// sharing vocabulary land close together under cosine similarity, which is enough for the
/// semantic half of hybrid ranking without a model download.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model: String,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model: format!("blake3-hashing-{dimension}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = blake3::hash(token.as_bytes());
            let bytes = digest.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            #[allow(clippy::cast_possible_truncation)]
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn available(&self) -> bool {
        self.dimension > 0
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.dimension == 0 {
            return Err(MembankError::EmbeddingUnavailable {
                reason: "embedding dimension is zero".to_string(),
            });
        }
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Embedder that is never available; rows are stored without vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEmbedder;

impl Embedder for DisabledEmbedder {
    fn model(&self) -> &str {
        "disabled"
    }

    fn dimension(&self) -> usize {
        0
    }

    fn available(&self) -> bool {
        false
    }

    fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(MembankError::EmbeddingUnavailable {
            reason: "embedding is disabled".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hybrid::cosine_similarity;

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed(&["buy milk today"]).unwrap();
        let b = embedder.embed(&["buy milk today"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
        let norm: f32 = a[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder
            .embed(&["buy milk", "remember to buy milk", "rust lifetimes explained"])
            .unwrap();
        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let vectors = HashingEmbedder::new(8).embed(&[""]).unwrap();
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn disabled_embedder_reports_unavailable() {
        let err = embed_all(&DisabledEmbedder, &["x"]).unwrap_err();
        assert!(matches!(err, MembankError::EmbeddingUnavailable { .. }));
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn model(&self) -> &str {
            "short"
        }
        fn dimension(&self) -> usize {
            1
        }
        fn available(&self) -> bool {
            true
        }
        fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }
    }

    #[test]
    fn length_mismatch_is_unavailable() {
        let err = embed_all(&ShortEmbedder, &["a", "b"]).unwrap_err();
        assert!(matches!(err, MembankError::EmbeddingUnavailable { .. }));
    }
}
