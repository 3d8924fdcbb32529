//! Storage abstraction for ragdoll.
//!
//! The [`Store`] trait is everything the change tracker, indexing pipeline,
//! and search aggregator need from persistence: a file table keyed by
//! unique path, a chunk collection keyed by `(file_id, chunk_index)`, and a
//! nearest-neighbor query under cosine distance.
//!
//! Every mutating method is one unit of work. Backends must make it atomic
//! against concurrent readers: a search never observes a half-replaced
//! chunk set, and a deletion never leaves orphaned chunks.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChunkHit, ChunkRecord, FileRecord, IndexCommit, NewChunk, NewFile, StoreStats};

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_file`](Store::upsert_file) | Atomic insert-or-update keyed by path |
/// | [`get_file_by_path`](Store::get_file_by_path) | Look up a record by canonical path |
/// | [`get_file_by_id`](Store::get_file_by_id) | Look up a record by id |
/// | [`delete_file`](Store::delete_file) | Delete a record and its chunks |
/// | [`list_files`](Store::list_files) | One page of records plus the total count |
/// | [`list_dirty_files`](Store::list_dirty_files) | Records awaiting indexing |
/// | [`mark_all_dirty`](Store::mark_all_dirty) | Force every record back to DIRTY |
/// | [`replace_chunks`](Store::replace_chunks) | Delete-then-insert a file's chunks |
/// | [`mark_indexed`](Store::mark_indexed) | Move a record to CLEAN |
/// | [`commit_index`](Store::commit_index) | Both of the above in one transaction |
/// | [`get_chunks`](Store::get_chunks) | A file's chunks in index order |
/// | [`nearest_chunks`](Store::nearest_chunks) | k nearest chunks by cosine distance |
/// | [`stats`](Store::stats) | Aggregate counts |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a record for `file.path`, or update the existing one.
    ///
    /// On conflict, `metadata` is always replaced. If `content_hash`
    /// differs from the stored one it is replaced and `is_dirty` set;
    /// otherwise `is_dirty` and `indexed_at` are left untouched. Returns
    /// the record as stored after the upsert.
    async fn upsert_file(&self, file: &NewFile) -> Result<FileRecord>;

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>>;

    async fn get_file_by_id(&self, id: Uuid) -> Result<Option<FileRecord>>;

    /// Delete a record and all its chunks. Returns the number of records
    /// removed (0 or 1).
    async fn delete_file(&self, id: Uuid) -> Result<u64>;

    /// Return page `page` (1-based) of all records, newest id first, with
    /// the total record count.
    async fn list_files(&self, page: u32, per_page: u32) -> Result<(Vec<FileRecord>, u64)>;

    /// Up to `limit` dirty records, oldest id first.
    async fn list_dirty_files(&self, limit: usize) -> Result<Vec<FileRecord>>;

    /// Set `is_dirty` on every record. Returns the number of records touched.
    async fn mark_all_dirty(&self) -> Result<u64>;

    /// Replace all chunks of `file_id` with `chunks`, atomically.
    async fn replace_chunks(&self, file_id: Uuid, chunks: &[NewChunk]) -> Result<()>;

    /// Set `is_dirty = false` and `indexed_at = at`.
    async fn mark_indexed(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Replace chunks and mark the file indexed as one unit of work.
    ///
    /// Applies only if the stored record still has `commit.content_hash`;
    /// returns `false` (and changes nothing) when the record was re-added
    /// with different content or deleted in the meantime.
    ///
    /// Implementations must apply the hash check, the chunk replacement,
    /// and the CLEAN transition atomically: on any error nothing changes.
    async fn commit_index(&self, commit: &IndexCommit) -> Result<bool>;

    /// All chunks of a file, ordered by `chunk_index`.
    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>>;

    /// Up to `k` chunks ordered by ascending cosine distance to `query`.
    /// Ties are broken by `(file id, chunk_index)` ascending.
    async fn nearest_chunks(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>>;

    async fn stats(&self) -> Result<StoreStats>;
}
