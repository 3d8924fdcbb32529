//! Semantic search with chunk-to-file aggregation.
//!
//! The store answers nearest-neighbor queries at chunk granularity; callers
//! want files. [`SearchAggregator`] bridges the two.
//!
//! # Algorithm
//!
//! 1. Embed the query.
//! 2. Fetch `limit × over_fetch_factor` nearest chunks. Several chunks of
//!    one file usually collapse into a single result, so fetching exactly
//!    `limit` chunks would return too few files.
//! 3. Score each chunk as `1 - distance / 2` (cosine distance in `[0, 2]`).
//! 4. Group by file in first-seen order. A file's score is the **maximum**
//!    of its chunk scores: a file is as relevant as its best passage.
//! 5. Sort by score descending (stable) and keep the first `limit`.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result};
use crate::models::{ChunkHit, ChunkSearchResult, SearchResult};
use crate::store::Store;

/// Default number of raw chunks fetched per requested result.
pub const DEFAULT_OVER_FETCH_FACTOR: usize = 5;

/// Runs queries against a [`Store`] and folds chunk hits into files.
#[derive(Clone)]
pub struct SearchAggregator {
    store: Arc<dyn Store>,
    gateway: EmbeddingGateway,
    over_fetch_factor: usize,
}

impl SearchAggregator {
    /// # Errors
    ///
    /// [`Error::Config`] when `over_fetch_factor == 0`.
    pub fn new(
        store: Arc<dyn Store>,
        gateway: EmbeddingGateway,
        over_fetch_factor: usize,
    ) -> Result<Self> {
        if over_fetch_factor == 0 {
            return Err(Error::config("retrieval over_fetch_factor must be >= 1"));
        }
        Ok(Self {
            store,
            gateway,
            over_fetch_factor,
        })
    }

    /// Return up to `limit` files ranked by relevance to `query`.
    ///
    /// A blank query or a zero limit returns nothing without calling the
    /// embedding provider.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        include_chunks: bool,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.gateway.embed_one(query).await?;
        let raw_limit = limit.saturating_mul(self.over_fetch_factor);
        let hits = self.store.nearest_chunks(&query_vec, raw_limit).await?;

        tracing::debug!(raw_limit, hits = hits.len(), "fetched nearest chunks");
        Ok(aggregate(hits, limit, include_chunks))
    }
}

/// Map a cosine distance in `[0, 2]` to a score in `[0, 1]`, higher is
/// better.
pub fn distance_to_score(distance: f64) -> f64 {
    1.0 - distance / 2.0
}

/// Collapse chunk hits (ordered by ascending distance) into file results.
pub fn aggregate(hits: Vec<ChunkHit>, limit: usize, include_chunks: bool) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = Vec::new();
    let mut by_file: HashMap<Uuid, usize> = HashMap::new();

    for hit in hits {
        let chunk = ChunkSearchResult {
            score: distance_to_score(hit.distance),
            chunk_index: hit.chunk_index,
            content: hit.content,
        };

        match by_file.get(&hit.file.id) {
            Some(&slot) => {
                let result = &mut results[slot];
                result.score = result.score.max(chunk.score);
                if let Some(chunks) = result.matched_chunks.as_mut() {
                    chunks.push(chunk);
                }
            }
            None => {
                by_file.insert(hit.file.id, results.len());
                results.push(SearchResult {
                    file: hit.file,
                    score: chunk.score,
                    matched_chunks: include_chunks.then(|| vec![chunk]),
                });
            }
        }
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}
