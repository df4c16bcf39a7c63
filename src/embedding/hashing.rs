//! Feature-hashing embedder.
//!
//! Each lowercased alphanumeric token is hashed with SHA-256 into one of
//! `dims` buckets; the top bit of the hash picks the sign. The term-frequency
//! vector is L2-normalised. Vectors depend only on the input text, so an
//! artifact built today stays comparable with queries embedded later.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::error::Result;

pub(super) const DEFAULT_DIMS: usize = 384;

pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// `dims` must be non-zero; config validation rejects `embedding.dims = 0`.
    pub fn new(dims: usize) -> Self {
        debug_assert!(dims > 0, "hashing embedder needs at least one dimension");
        // release builds clamp so bucket selection never divides by zero
        Self { dims: dims.max(1) }
    }

    /// Embed one text. Text without any alphanumeric token maps to the zero vector.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let h = u64::from_le_bytes(head);
            let bucket = (h % self.dims as u64) as usize;
            let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn deterministic_and_normalised() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_one("What is fever?");
        let b = e.embed_one("What is fever?");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashingEmbedder::new(DEFAULT_DIMS);
        assert_eq!(e.embed_one("FEVER, cough!"), e.embed_one("fever cough"));
    }

    #[test]
    fn shared_terms_score_higher() {
        let e = HashingEmbedder::new(DEFAULT_DIMS);
        let q = e.embed_one("What causes fever?");
        let fever = e.embed_one("Q: What is fever?\nA: Elevated body temperature.");
        let cough = e.embed_one("Q: What is cough?\nA: A reflex clearing airways.");
        assert!(cosine_similarity(&q, &fever) > cosine_similarity(&q, &cough));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "at least one dimension")]
    fn zero_dims_is_rejected() {
        HashingEmbedder::new(0);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(8);
        assert!(e.embed_one("  ...  ").iter().all(|x| *x == 0.0));
    }
}
