//! Deterministic offline provider.
//!
//! Each vector is stretched out of SHA-256 digests of the text (one digest
//! per 8 components, keyed by block number) and L2-normalized. Identical
//! texts always produce identical vectors; different texts produce
//! unrelated ones. Useful for tests and for exercising the pipeline without
//! network access.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use ragdoll_core::embedding::EmbeddingProvider;
use ragdoll_core::Result;

pub struct MockProvider {
    dims: usize,
}

impl MockProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = Vec::with_capacity(self.dims);
        let mut block: u32 = 0;
        while v.len() < self.dims {
            let digest = Sha256::new()
                .chain_update(block.to_le_bytes())
                .chain_update(text.as_bytes())
                .finalize();
            for word in digest.chunks_exact(4) {
                if v.len() == self.dims {
                    break;
                }
                let n = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                v.push((n as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32);
            }
            block += 1;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn model_name(&self) -> &str {
        "mock"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tracing::debug!(texts = texts.len(), "generating mock embeddings");
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdoll_core::embedding::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalized() {
        let provider = MockProvider::new(37);
        let a = provider.vector_for("hello");
        assert_eq!(a.len(), 37);
        assert_eq!(a, provider.vector_for("hello"));
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_different_texts_differ() {
        let provider = MockProvider::new(64);
        let a = provider.vector_for("alpha");
        let b = provider.vector_for("beta");
        assert_ne!(a, b);
        assert!(cosine_similarity(&a, &b) < 0.9);
    }

    #[tokio::test]
    async fn test_embed_preserves_order() {
        let provider = MockProvider::new(8);
        let texts = vec!["one".to_string(), "two".to_string()];
        let out = provider.embed(&texts).await.unwrap();
        assert_eq!(out[0], provider.vector_for("one"));
        assert_eq!(out[1], provider.vector_for("two"));
    }
}
