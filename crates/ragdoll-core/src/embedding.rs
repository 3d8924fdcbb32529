//! Embedding provider trait, batching gateway, and vector utilities.
//!
//! [`EmbeddingProvider`] is the capability every backend implements
//! (text → fixed-length vector, batchable, fallible). Concrete providers
//! (OpenAI, Ollama, mock, fastembed) live in the `ragdoll` app crate.
//!
//! [`EmbeddingGateway`] wraps a provider and is what the pipeline and the
//! search aggregator talk to. It sub-batches requests, preserves input
//! order, and rejects responses with the wrong count or dimension.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1024`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts. Output `i` must correspond to input `i`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Stateless adapter between the pipeline and an [`EmbeddingProvider`].
///
/// Cloning is cheap; clones share the provider.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl EmbeddingGateway {
    /// Wrap `provider`, sending at most `batch_size` texts per call.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when `batch_size == 0` or the provider declares a
    /// zero dimension.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config("embedding batch_size must be > 0"));
        }
        if provider.dims() == 0 {
            return Err(Error::config(format!(
                "embedding provider '{}' declares zero dimensions",
                provider.model_name()
            )));
        }
        Ok(Self {
            provider,
            batch_size,
        })
    }

    pub fn dims(&self) -> usize {
        self.provider.dims()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed `texts`, preserving order.
    ///
    /// An empty input returns an empty output without contacting the
    /// provider.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dims = self.provider.dims();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            tracing::debug!(
                model = self.provider.model_name(),
                texts = batch.len(),
                "embedding batch"
            );
            let out = self.provider.embed(batch).await?;
            if out.len() != batch.len() {
                return Err(Error::provider(format!(
                    "provider returned {} vectors for {} texts",
                    out.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = out.iter().find(|v| v.len() != dims) {
                return Err(Error::provider(format!(
                    "provider returned a {}-dimensional vector, expected {}",
                    bad.len(),
                    dims
                )));
            }
            vectors.extend(out);
        }

        Ok(vectors)
    }

    /// Embed a single text (a batch of one).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider("empty embedding response"))
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use ragdoll_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
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

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine distance `1 - cos(a, b)`, clamped to `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    (1.0 - cosine_similarity(a, b) as f64).clamp(0.0, 2.0)
}
