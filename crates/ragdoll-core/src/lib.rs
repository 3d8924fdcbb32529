//! # ragdoll core
//!
//! The indexing and retrieval pipeline behind ragdoll: change detection by
//! content hash, fixed-window chunking, the chunk → embedding → store write
//! path, and chunk-to-file search aggregation.
//!
//! This crate contains no SQL and no HTTP. Persistence goes through the
//! [`store::Store`] trait and embeddings through
//! [`embedding::EmbeddingProvider`]; the `ragdoll` application crate
//! provides the SQLite store and the concrete providers.
//!
//! ```text
//! add(path) ──▶ ChangeTracker ──▶ Store (files)
//! index()   ──▶ IndexingPipeline: Chunker → EmbeddingGateway → Store (chunks)
//! search(q) ──▶ SearchAggregator: EmbeddingGateway → Store::nearest_chunks → files
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
